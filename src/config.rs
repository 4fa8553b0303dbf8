use clap::Parser;
use std::path::PathBuf;

use crate::analysis::AnalyserConfig;
use crate::visual::{RenderStyle, RingSpec, RingTuning};
use crate::visualizer::VisualizerConfig;

/// Plays WAV files and draws an audio-reactive ring field.
#[derive(Parser, Debug, Clone)]
#[command(name = "ring-visualizer", version)]
pub struct Args {
    /// WAV files to queue
    pub tracks: Vec<PathBuf>,

    /// Side length of the square canvas in pixels
    #[arg(long, default_value_t = 352)]
    pub size: u32,

    /// Analyser FFT size (power of two, 32..=32768)
    #[arg(long, default_value_t = 128)]
    pub fft_size: usize,

    /// Analyser smoothing time constant (0..=1)
    #[arg(long, default_value_t = 0.8)]
    pub smoothing: f32,

    #[arg(long, default_value_t = 4)]
    pub rings: usize,

    /// Dots per ring
    #[arg(long, default_value_t = 22)]
    pub circles: usize,

    #[arg(long, default_value_t = 55.0)]
    pub min_radius: f32,

    /// Space kept between the outer ring and the canvas edge
    #[arg(long, default_value_t = 50.0)]
    pub safety_margin: f32,

    /// Base hue in degrees
    #[arg(long, default_value_t = 230.0)]
    pub base_hue: f32,

    /// Paint a soft gradient behind the rings
    #[arg(long)]
    pub ambient: bool,

    /// Start playing immediately instead of waiting for Space
    #[arg(long)]
    pub autoplay: bool,
}

impl Args {
    pub fn visualizer_config(&self) -> VisualizerConfig {
        let side = self.size as f32;
        VisualizerConfig {
            width: side,
            height: side,
            rings: RingSpec {
                ring_count: self.rings,
                circle_count: self.circles,
                min_radius: self.min_radius,
                safety_margin: self.safety_margin,
                base_hue: self.base_hue,
            },
            tuning: RingTuning::default(),
            analyser: AnalyserConfig {
                fft_size: self.fft_size,
                smoothing: self.smoothing,
                ..Default::default()
            },
            style: RenderStyle {
                ambient: self.ambient,
                ..Default::default()
            },
        }
    }
}
