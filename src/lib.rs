//! Audio-reactive ring visualizer.
//!
//! Listens to one playing audio element, samples its spectrum every frame
//! and draws it as concentric rings of dots.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod visual;
pub mod visualizer;

pub use error::{Result, VisualizerError};
