pub mod analyzer;

pub use analyzer::{Analysis, VideoAnalyzer};
