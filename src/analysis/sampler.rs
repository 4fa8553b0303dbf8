/// Anything that can report the current magnitude spectrum of live audio.
pub trait SpectrumSource {
    fn frequency_bin_count(&self) -> usize;
    fn is_suspended(&self) -> bool;
    /// Fire-and-forget; the next frame checks again.
    fn resume(&mut self);
    fn byte_frequency_data(&mut self, out: &mut [u8]);
}

/// Per-frame spectrum reader with a reusable buffer.
pub struct SpectrumSampler {
    buffer: Vec<u8>,
}

impl SpectrumSampler {
    pub fn new(bin_count: usize) -> Self {
        Self {
            buffer: vec![0; bin_count],
        }
    }

    pub fn sample(&mut self, source: &mut dyn SpectrumSource) -> &[u8] {
        if source.is_suspended() {
            source.resume();
        }
        let bins = source.frequency_bin_count();
        if self.buffer.len() != bins {
            // only happens when the source is swapped for one with another resolution
            self.buffer.resize(bins, 0);
        }
        source.byte_frequency_data(&mut self.buffer);
        &self.buffer
    }

    /// A flat spectrum, used while no song is selected.
    pub fn silence(&mut self) -> &[u8] {
        self.buffer.fill(0);
        &self.buffer
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }
}

/// Synthetic source for exercising the render path without an audio stack.
#[cfg(test)]
pub struct FixedSpectrum {
    pub bins: Vec<u8>,
    pub suspended: bool,
    pub resume_calls: usize,
    pub resumes_after: usize,
}

#[cfg(test)]
impl FixedSpectrum {
    pub fn new(bins: Vec<u8>) -> Self {
        Self {
            bins,
            suspended: false,
            resume_calls: 0,
            resumes_after: 0,
        }
    }
}

#[cfg(test)]
impl SpectrumSource for FixedSpectrum {
    fn frequency_bin_count(&self) -> usize {
        self.bins.len()
    }

    fn is_suspended(&self) -> bool {
        self.suspended
    }

    fn resume(&mut self) {
        self.resume_calls += 1;
        if self.resume_calls > self.resumes_after {
            self.suspended = false;
        }
    }

    fn byte_frequency_data(&mut self, out: &mut [u8]) {
        if self.suspended {
            out.fill(0);
            return;
        }
        out.copy_from_slice(&self.bins);
    }
}
