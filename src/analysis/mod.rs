pub mod analyser;
pub mod context;
pub mod graph;
pub mod sampler;

pub use analyser::{AnalyserConfig, AnalyserNode};
pub use context::{Activation, AudioContext, ContextState};
pub use graph::AnalysisGraph;
pub use sampler::{SpectrumSampler, SpectrumSource};
