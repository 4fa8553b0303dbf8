use anyhow::Context;
use ringbuf::{HeapConsumer, HeapProducer, HeapRb};
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::wav::AudioData;
use crate::error::{Result, VisualizerError};

/// Samples buffered between the playback thread and whoever taps the element.
const TAP_CAPACITY: usize = 1 << 15;
/// Played samples are forwarded to the tap in chunks of this size.
const TAP_CHUNK: usize = 256;
const NO_SEEK: usize = usize::MAX;

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(u64);

impl ElementId {
    pub fn next() -> Self {
        Self(NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A live audio element whose decoded output can be captured for analysis.
///
/// Capturing is a one-shot operation: the second call for the same element
/// fails with [`VisualizerError::AlreadyCaptured`], so callers must remember
/// which elements they have already wrapped.
pub trait MediaElement {
    fn id(&self) -> ElementId;
    fn capture_stream(&mut self) -> Result<MediaTap>;
}

/// Consumer end of an element's capture stream.
pub struct MediaTap {
    consumer: HeapConsumer<f32>,
    window: VecDeque<f32>, // sliding window of the latest samples
}

impl MediaTap {
    pub fn new(consumer: HeapConsumer<f32>) -> Self {
        Self {
            consumer,
            window: VecDeque::new(),
        }
    }

    /// Creates a connected producer/tap pair.
    pub fn channel(capacity: usize) -> (HeapProducer<f32>, Self) {
        let (producer, consumer) = HeapRb::<f32>::new(capacity).split();
        (producer, Self::new(consumer))
    }

    /// Drains new samples into the sliding window, then copies the latest
    /// `size` samples into `out`. Missing history reads as silence.
    pub fn read_window(&mut self, out: &mut Vec<f32>, size: usize) {
        while self.window.len() < size {
            self.window.push_front(0.0);
        }
        while let Some(s) = self.consumer.pop() {
            self.window.push_back(s);
            if self.window.len() > size {
                self.window.pop_front();
            }
        }
        while self.window.len() > size {
            self.window.pop_front();
        }
        out.clear();
        out.extend(self.window.iter().copied());
    }

    /// Drops everything buffered so far, queued and windowed alike.
    pub fn clear(&mut self) {
        while self.consumer.pop().is_some() {}
        self.window.clear();
    }
}

#[derive(Default)]
struct Transport {
    paused: AtomicBool,
    ended: AtomicBool,
    position: AtomicUsize,
    seek: AtomicUsize,
}

impl Transport {
    /// Paused at the start, with no seek queued.
    fn new() -> Self {
        Self {
            paused: AtomicBool::new(true),
            seek: AtomicUsize::new(NO_SEEK),
            ..Default::default()
        }
    }
}

/// Desktop stand-in for a browser `<audio>` element: plays one track at a
/// time through rodio and forwards whatever it plays to a single tap.
pub struct AudioElement {
    id: ElementId,
    _stream: OutputStream, // dropping this stops audio
    handle: OutputStreamHandle,
    sink: Option<Sink>,
    track: Option<Arc<AudioData>>,
    transport: Arc<Transport>,
    tap_writer: Arc<Mutex<HeapProducer<f32>>>,
    tap_reader: Option<HeapConsumer<f32>>,
}

impl AudioElement {
    pub fn open() -> anyhow::Result<Self> {
        let (_stream, handle) =
            OutputStream::try_default().context("Failed to open audio output device")?;
        let (tap_writer, tap_reader) = HeapRb::<f32>::new(TAP_CAPACITY).split();
        Ok(Self {
            id: ElementId::next(),
            _stream,
            handle,
            sink: None,
            track: None,
            transport: Arc::new(Transport::new()),
            tap_writer: Arc::new(Mutex::new(tap_writer)),
            tap_reader: Some(tap_reader),
        })
    }

    /// Replaces the current track. The play/pause state carries over.
    pub fn load(&mut self, track: Arc<AudioData>) -> anyhow::Result<()> {
        // dropping the old sink stops its source
        self.sink = None;
        self.transport.ended.store(false, Ordering::Relaxed);
        self.transport.position.store(0, Ordering::Relaxed);
        self.transport.seek.store(NO_SEEK, Ordering::Relaxed);

        let sink = Sink::try_new(&self.handle).context("Failed to create audio sink")?;
        sink.append(ElementSource {
            track: Arc::clone(&track),
            cursor: 0,
            transport: Arc::clone(&self.transport),
            tap: Arc::clone(&self.tap_writer),
            pending: Vec::with_capacity(TAP_CHUNK),
        });
        self.sink = Some(sink);
        self.track = Some(track);
        Ok(())
    }

    /// Stops playback and forgets the track.
    pub fn unload(&mut self) {
        self.sink = None;
        self.track = None;
        self.transport.position.store(0, Ordering::Relaxed);
    }

    pub fn play(&self) {
        self.transport.paused.store(false, Ordering::Relaxed);
    }

    pub fn pause(&self) {
        self.transport.paused.store(true, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.transport.paused.load(Ordering::Relaxed)
    }

    /// Returns true once per finished track.
    pub fn take_ended(&self) -> bool {
        self.transport.ended.swap(false, Ordering::Relaxed)
    }

    pub fn current_time(&self) -> f32 {
        let Some(track) = &self.track else {
            return 0.0;
        };
        self.transport.position.load(Ordering::Relaxed) as f32 / track.sample_rate as f32
    }

    pub fn duration(&self) -> f32 {
        self.track.as_ref().map_or(0.0, |t| t.duration_sec)
    }

    pub fn seek(&self, secs: f32) {
        let Some(track) = &self.track else {
            return;
        };
        let secs = secs.clamp(0.0, track.duration_sec);
        let target = (secs * track.sample_rate as f32) as usize;
        self.transport.seek.store(target, Ordering::Relaxed);
    }
}

impl MediaElement for AudioElement {
    fn id(&self) -> ElementId {
        self.id
    }

    fn capture_stream(&mut self) -> Result<MediaTap> {
        self.tap_reader
            .take()
            .map(MediaTap::new)
            .ok_or(VisualizerError::AlreadyCaptured(self.id))
    }
}

/// Plays one decoded track and forwards every played sample to the tap, so
/// analysis sees exactly what is heard. While paused it emits silence rather
/// than stalling, which lets the spectrum settle to zero.
struct ElementSource {
    track: Arc<AudioData>,
    cursor: usize,
    transport: Arc<Transport>,
    tap: Arc<Mutex<HeapProducer<f32>>>,
    pending: Vec<f32>,
}

impl ElementSource {
    fn flush_tap(&mut self) {
        // never block the audio thread; a missed chunk is only a visual glitch
        if let Ok(mut tap) = self.tap.try_lock() {
            tap.push_slice(&self.pending);
        }
        self.pending.clear();
    }
}

impl Iterator for ElementSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let seek = self.transport.seek.swap(NO_SEEK, Ordering::Relaxed);
        if seek != NO_SEEK {
            self.cursor = seek.min(self.track.samples_mono.len());
            self.transport.position.store(self.cursor, Ordering::Relaxed);
        }

        let s = if self.transport.paused.load(Ordering::Relaxed) {
            0.0
        } else {
            match self.track.samples_mono.get(self.cursor) {
                Some(&s) => {
                    self.cursor += 1;
                    self.transport.position.store(self.cursor, Ordering::Relaxed);
                    s
                }
                None => {
                    self.flush_tap();
                    self.transport.ended.store(true, Ordering::Relaxed);
                    return None;
                }
            }
        };

        self.pending.push(s);
        if self.pending.len() >= TAP_CHUNK {
            self.flush_tap();
        }
        Some(s)
    }
}

impl Source for ElementSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }
    fn channels(&self) -> u16 {
        1
    }
    fn sample_rate(&self) -> u32 {
        self.track.sample_rate
    }
    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
