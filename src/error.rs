use thiserror::Error;

use crate::audio::ElementId;

#[derive(Debug, Error)]
pub enum VisualizerError {
    #[error("audio analysis is unavailable: {0}")]
    Unsupported(String),

    #[error("audio element {0} is already captured by a source node")]
    AlreadyCaptured(ElementId),

    #[error("fft size {0} must be a power of two between 32 and 32768")]
    InvalidFftSize(usize),

    #[error("smoothing time constant {0} must lie within [0, 1]")]
    InvalidSmoothing(f32),

    #[error("decibel range [{min}, {max}] is empty")]
    InvalidDecibelRange { min: f32, max: f32 },
}

pub type Result<T> = std::result::Result<T, VisualizerError>;
