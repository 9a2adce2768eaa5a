//! Video analyzer facade

use std::path::Path;
use std::sync::Arc;

use log::info;
use serde::Serialize;

use crate::core::pipeline::{
    self, CancelToken, ConfigError, PipelineConfig, PipelineError, PipelineStats,
};
use crate::core::pose::model::PoseModel;
use crate::core::pose::sequence::KeypointSequence;

/// Result of one analyzed upload, handed to the scoring layer. `test_type`
/// is pass-through context; the pipeline itself never interprets it.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub test_type: String,
    pub sequence: KeypointSequence,
    pub stats: PipelineStats,
}

/// Video assessment entry point: one model handle plus deployment config,
/// shared across uploads.
///
/// The model is loaded once and reused for every frame of every invocation;
/// reloading per frame would dwarf all other costs. `analyze` is a blocking
/// long-running call and belongs on a blocking worker, never on a shared
/// event-processing thread.
pub struct VideoAnalyzer {
    model: Arc<dyn PoseModel>,
    config: PipelineConfig,
}

impl VideoAnalyzer {
    /// Builds an analyzer around an explicitly provided model handle.
    pub fn with_model(model: Arc<dyn PoseModel>, config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        info!("🎬 VideoAnalyzer: created (workers={})", config.worker_count());
        Ok(Self { model, config })
    }

    /// Builds an analyzer that loads the ONNX pose model named by
    /// `config.model_path`.
    #[cfg(feature = "onnx")]
    pub fn create(config: PipelineConfig) -> Result<Self, PipelineError> {
        use crate::core::pose::onnx::OnnxPoseModel;

        let model_path = config.model_path.clone().ok_or_else(|| {
            PipelineError::ModelUnavailable("model_path not configured".into())
        })?;
        let model = OnnxPoseModel::load(&model_path)
            .map_err(|e| PipelineError::ModelUnavailable(e.to_string()))?;
        Self::with_model(Arc::new(model), config).map_err(PipelineError::Config)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the full pipeline over one uploaded video.
    pub fn analyze(&self, video_path: &Path, test_type: &str) -> Result<Analysis, PipelineError> {
        self.analyze_with_cancel(video_path, test_type, &CancelToken::new())
    }

    /// Like [`analyze`](Self::analyze), but cooperatively cancellable. A
    /// cancelled analysis still reclaims its working area and is rerun from
    /// scratch if wanted again.
    pub fn analyze_with_cancel(
        &self,
        video_path: &Path,
        test_type: &str,
        cancel: &CancelToken,
    ) -> Result<Analysis, PipelineError> {
        info!("🎬 analyzing {video_path:?} (test_type={test_type})");

        let output = pipeline::run(
            video_path,
            &self.config.sampling,
            self.model.as_ref(),
            self.config.worker_count(),
            cancel,
        )?;

        info!(
            "analysis of {video_path:?} done: {} poses",
            output.sequence.len()
        );
        Ok(Analysis {
            test_type: test_type.to_string(),
            sequence: output.sequence,
            stats: output.stats,
        })
    }
}

impl Drop for VideoAnalyzer {
    fn drop(&mut self) {
        info!("🗑️ VideoAnalyzer: released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::SamplingPolicy;
    use crate::core::pose::model::MockPoseModel;

    #[test]
    fn test_create_with_mock_model() {
        let analyzer =
            VideoAnalyzer::with_model(Arc::new(MockPoseModel::new()), PipelineConfig::default())
                .unwrap();
        assert!(analyzer.config().validate().is_ok());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = PipelineConfig {
            sampling: SamplingPolicy::fixed_count(0, 640, 480),
            ..Default::default()
        };
        let result = VideoAnalyzer::with_model(Arc::new(MockPoseModel::new()), config);
        assert!(result.is_err());
    }

    #[test]
    fn test_analyze_nonexistent_video_is_extraction_failure() {
        let analyzer =
            VideoAnalyzer::with_model(Arc::new(MockPoseModel::new()), PipelineConfig::default())
                .unwrap();
        let err = analyzer
            .analyze(Path::new("/nonexistent/upload.mp4"), "vertical_jump")
            .unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(_)));
    }
}
