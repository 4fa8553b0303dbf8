use cpal::traits::{DeviceTrait, HostTrait};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Result, VisualizerError};

/// Host record of whether the user has started playback. A suspended
/// context can only resume once this has been granted.
#[derive(Debug, Clone, Default)]
pub struct Activation(Arc<AtomicBool>);

impl Activation {
    pub fn grant(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_granted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

/// Audio-processing context. Starts suspended, the way a browser context
/// does before any user gesture.
pub struct AudioContext {
    state: ContextState,
    sample_rate: u32,
    activation: Activation,
}

impl AudioContext {
    pub fn new(sample_rate: u32, activation: Activation) -> Self {
        Self {
            state: ContextState::Suspended,
            sample_rate,
            activation,
        }
    }

    /// Opens a context on the default output device. Fails when the host has
    /// no usable output, which callers treat as an unsupported environment.
    pub fn open_default(activation: Activation) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| VisualizerError::Unsupported("no audio output device".into()))?;
        let config = device
            .default_output_config()
            .map_err(|e| VisualizerError::Unsupported(e.to_string()))?;
        Ok(Self::new(config.sample_rate().0, activation))
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Best-effort resume; returns whether the context is now running.
    pub fn resume(&mut self) -> bool {
        if self.state == ContextState::Suspended && self.activation.is_granted() {
            self.state = ContextState::Running;
        }
        self.state == ContextState::Running
    }

    pub fn close(&mut self) {
        self.state = ContextState::Closed;
    }
}
