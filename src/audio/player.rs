use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use super::element::AudioElement;
use super::wav::AudioData;
use crate::analysis::Activation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub title: String,
    pub path: PathBuf,
}

impl Song {
    pub fn from_path(path: PathBuf) -> Self {
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { title, path }
    }
}

/// The transport controls the player drives on its element.
pub trait Playback {
    /// Replaces the current track. The play/pause state carries over.
    fn load(&mut self, track: Arc<AudioData>) -> anyhow::Result<()>;
    fn unload(&mut self);
    fn play(&self);
    fn pause(&self);
    fn is_paused(&self) -> bool;
    /// True once per finished track.
    fn take_ended(&self) -> bool;
    fn current_time(&self) -> f32;
    fn seek(&self, secs: f32);
}

impl Playback for AudioElement {
    fn load(&mut self, track: Arc<AudioData>) -> anyhow::Result<()> {
        AudioElement::load(self, track)
    }
    fn unload(&mut self) {
        AudioElement::unload(self)
    }
    fn play(&self) {
        AudioElement::play(self)
    }
    fn pause(&self) {
        AudioElement::pause(self)
    }
    fn is_paused(&self) -> bool {
        AudioElement::is_paused(self)
    }
    fn take_ended(&self) -> bool {
        AudioElement::take_ended(self)
    }
    fn current_time(&self) -> f32 {
        AudioElement::current_time(self)
    }
    fn seek(&self, secs: f32) {
        AudioElement::seek(self, secs)
    }
}

/// Minimal host player: a queue of WAV files played through one element.
pub struct Player<E: Playback = AudioElement> {
    element: E,
    queue: Vec<Song>,
    current: Option<usize>,
    activation: Activation,
}

impl<E: Playback> Player<E> {
    pub fn new(element: E, queue: Vec<Song>, activation: Activation) -> Self {
        Self {
            element,
            queue,
            current: None,
            activation,
        }
    }

    pub fn element(&self) -> &E {
        &self.element
    }

    pub fn element_mut(&mut self) -> &mut E {
        &mut self.element
    }

    pub fn current_song(&self) -> Option<&Song> {
        self.current.and_then(|i| self.queue.get(i))
    }

    /// Loads the song at `index`, skipping forward over files that fail to
    /// decode. Clears the current song when nothing playable remains.
    pub fn select(&mut self, index: usize) {
        for i in index..self.queue.len() {
            let song = &self.queue[i];
            match AudioData::load_wav(&song.path) {
                Ok(data) => match self.element.load(Arc::new(data)) {
                    Ok(()) => {
                        info!("now playing: {}", song.title);
                        self.current = Some(i);
                        return;
                    }
                    Err(e) => warn!("cannot play {}: {e:#}", song.path.display()),
                },
                Err(e) => warn!("cannot decode {}: {e:#}", song.path.display()),
            }
        }
        self.element.unload();
        self.element.pause();
        self.current = None;
    }

    pub fn toggle_play(&mut self) {
        if self.element.is_paused() {
            self.play();
        } else {
            self.element.pause();
        }
    }

    pub fn play(&mut self) {
        // starting playback is the user gesture that lets analysis resume
        self.activation.grant();
        if self.current.is_none() && !self.queue.is_empty() {
            self.select(0);
        }
        self.element.play();
    }

    pub fn next(&mut self) {
        let next = self.current.map_or(0, |i| i + 1);
        self.select(next);
    }

    pub fn previous(&mut self) {
        let prev = self.current.map_or(0, |i| i.saturating_sub(1));
        self.select(prev);
    }

    pub fn seek_by(&mut self, delta_secs: f32) {
        self.element.seek(self.element.current_time() + delta_secs);
    }

    /// Advances past finished tracks. Call once per frame.
    pub fn poll(&mut self) {
        if self.element.take_ended() {
            self.next();
        }
    }
}
