use hound::{SampleFormat, WavReader};
use std::io::Read;
use std::path::Path;

/// A fully decoded track, downmixed to mono.
#[derive(Clone)]
pub struct AudioData {
    pub sample_rate: u32,
    pub samples_mono: Vec<f32>,
    pub duration_sec: f32,
}

impl AudioData {
    pub fn load_wav<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Self::from_reader(WavReader::open(path)?)
    }

    pub fn from_reader<R: Read>(mut reader: WavReader<R>) -> anyhow::Result<Self> {
        let spec = reader.spec();
        let channels = spec.channels as usize;
        if channels != 1 && channels != 2 {
            anyhow::bail!("Only mono/stereo WAV supported got({channels}) instead.");
        }

        let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<_, _>>()?,
            (SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
                let scale = (1i64 << (bits - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|s| s as f32 / scale))
                    .collect::<Result<_, _>>()?
            }
            (format, bits) => {
                anyhow::bail!("Unsupported WAV encoding: {bits}-bit {format:?}")
            }
        };

        let samples_mono: Vec<f32> = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks_exact(2)
                .map(|frame| (frame[0] + frame[1]) * 0.5)
                .collect()
        };

        let sample_rate = spec.sample_rate;
        let duration_sec = samples_mono.len() as f32 / sample_rate as f32;
        Ok(Self {
            sample_rate,
            samples_mono,
            duration_sec,
        })
    }
}
