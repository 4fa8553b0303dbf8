use rustfft::{FftPlanner, num_complex::Complex32};
use std::sync::Arc;

use crate::error::{Result, VisualizerError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyserConfig {
    pub fft_size: usize,
    pub smoothing: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 128,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl AnalyserConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two() || !(32..=32_768).contains(&self.fft_size) {
            return Err(VisualizerError::InvalidFftSize(self.fft_size));
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(VisualizerError::InvalidSmoothing(self.smoothing));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(VisualizerError::InvalidDecibelRange {
                min: self.min_decibels,
                max: self.max_decibels,
            });
        }
        Ok(())
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }
}

/// Frequency-domain analyser producing a byte magnitude spectrum, one value
/// per bin, with the same scaling as a browser `AnalyserNode`.
pub struct AnalyserNode {
    config: AnalyserConfig,

    window: Vec<f32>,
    fft_buf: Vec<Complex32>,
    smoothed: Vec<f32>,

    fft: Arc<dyn rustfft::Fft<f32>>,
}

impl AnalyserNode {
    pub fn new(config: AnalyserConfig) -> Result<Self> {
        config.validate()?;
        let n = config.fft_size;
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n);

        Ok(Self {
            config,
            window: blackman(n),
            fft_buf: vec![Complex32::new(0.0, 0.0); n],
            smoothed: vec![0.0; n / 2],
            fft,
        })
    }

    pub fn fft_size(&self) -> usize {
        self.config.fft_size
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.config.frequency_bin_count()
    }

    /// Runs one analysis over the latest `fft_size` samples and folds the
    /// result into the smoothed magnitudes.
    pub fn process(&mut self, input: &[f32]) {
        let n = self.config.fft_size;
        debug_assert_eq!(input.len(), n);

        for (i, slot) in self.fft_buf.iter_mut().enumerate() {
            let x = input.get(i).copied().unwrap_or(0.0) * self.window[i];
            *slot = Complex32::new(x, 0.0);
        }
        self.fft.process(&mut self.fft_buf);

        let norm = 1.0 / n as f32;
        let tau = self.config.smoothing;
        for (k, s) in self.smoothed.iter_mut().enumerate() {
            let mag = self.fft_buf[k].norm() * norm;
            let next = tau * *s + (1.0 - tau) * mag;
            *s = if next.is_finite() { next } else { 0.0 };
        }
    }

    /// Writes the smoothed spectrum as bytes. Bins beyond `out` are dropped,
    /// slots beyond the bin count are zeroed.
    pub fn byte_frequency_data(&self, out: &mut [u8]) {
        let min = self.config.min_decibels;
        let range = self.config.max_decibels - min;
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = match self.smoothed.get(i) {
                Some(&mag) if mag > 0.0 => {
                    let db = 20.0 * mag.log10();
                    (255.0 * (db - min) / range).clamp(0.0, 255.0) as u8
                }
                _ => 0,
            };
        }
    }

    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|s| *s = 0.0);
    }
}

fn blackman(n: usize) -> Vec<f32> {
    const ALPHA: f32 = 0.16;
    let a0 = 0.5 * (1.0 - ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * ALPHA;
    let tau = 2.0 * std::f32::consts::PI;
    (0..n)
        .map(|i| {
            let x = i as f32 / n as f32;
            a0 - a1 * (tau * x).cos() + a2 * (2.0 * tau * x).cos()
        })
        .collect()
}
