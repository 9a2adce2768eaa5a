use serde::{Deserialize, Serialize};

/// The 17 body parts of the COCO single-pose topology, in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BodyPart {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl BodyPart {
    pub const COUNT: usize = 17;

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(BodyPart::Nose),
            1 => Some(BodyPart::LeftEye),
            2 => Some(BodyPart::RightEye),
            3 => Some(BodyPart::LeftEar),
            4 => Some(BodyPart::RightEar),
            5 => Some(BodyPart::LeftShoulder),
            6 => Some(BodyPart::RightShoulder),
            7 => Some(BodyPart::LeftElbow),
            8 => Some(BodyPart::RightElbow),
            9 => Some(BodyPart::LeftWrist),
            10 => Some(BodyPart::RightWrist),
            11 => Some(BodyPart::LeftHip),
            12 => Some(BodyPart::RightHip),
            13 => Some(BodyPart::LeftKnee),
            14 => Some(BodyPart::RightKnee),
            15 => Some(BodyPart::LeftAnkle),
            16 => Some(BodyPart::RightAnkle),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Label used in serialized output, matching the scoring layer's vocabulary.
    pub fn as_str(self) -> &'static str {
        match self {
            BodyPart::Nose => "nose",
            BodyPart::LeftEye => "leftEye",
            BodyPart::RightEye => "rightEye",
            BodyPart::LeftEar => "leftEar",
            BodyPart::RightEar => "rightEar",
            BodyPart::LeftShoulder => "leftShoulder",
            BodyPart::RightShoulder => "rightShoulder",
            BodyPart::LeftElbow => "leftElbow",
            BodyPart::RightElbow => "rightElbow",
            BodyPart::LeftWrist => "leftWrist",
            BodyPart::RightWrist => "rightWrist",
            BodyPart::LeftHip => "leftHip",
            BodyPart::RightHip => "rightHip",
            BodyPart::LeftKnee => "leftKnee",
            BodyPart::RightKnee => "rightKnee",
            BodyPart::LeftAnkle => "leftAnkle",
            BodyPart::RightAnkle => "rightAnkle",
        }
    }

    pub fn all() -> [BodyPart; Self::COUNT] {
        [
            BodyPart::Nose,
            BodyPart::LeftEye,
            BodyPart::RightEye,
            BodyPart::LeftEar,
            BodyPart::RightEar,
            BodyPart::LeftShoulder,
            BodyPart::RightShoulder,
            BodyPart::LeftElbow,
            BodyPart::RightElbow,
            BodyPart::LeftWrist,
            BodyPart::RightWrist,
            BodyPart::LeftHip,
            BodyPart::RightHip,
            BodyPart::LeftKnee,
            BodyPart::RightKnee,
            BodyPart::LeftAnkle,
            BodyPart::RightAnkle,
        ]
    }
}

/// One detected landmark: position in the sampled frame's pixel space plus
/// confidence. Immutable value type; thresholding is the scoring layer's job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub part: BodyPart,
    pub x: f32,
    pub y: f32,
    pub score: f32,
}

impl Keypoint {
    pub fn new(part: BodyPart, x: f32, y: f32, score: f32) -> Self {
        Self { part, x, y, score }
    }
}
