use crate::analysis::{SpectrumSampler, SpectrumSource};

use super::rings::RingMapper;
use super::surface::{Hsla, Rgba, Surface};

/// Token for one scheduled frame callback. Also the capability to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHandle(u64);

pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Display-refresh scheduler: at most one callback is pending per refresh,
/// and the host fires it once per update.
#[derive(Debug, Default)]
pub struct FrameQueue {
    issued: u64,
    pending: Option<FrameHandle>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out the pending callback, if any.
    pub fn take_due(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl FrameScheduler for FrameQueue {
    fn request_frame(&mut self) -> FrameHandle {
        self.issued += 1;
        let handle = FrameHandle(self.issued);
        self.pending = Some(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStyle {
    /// Painted over the previous frame; its alpha sets trail length.
    pub fade: Rgba,
    pub ambient: bool,
    pub ambient_alpha: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            fade: Rgba::from_bytes(17, 24, 39, 0.4),
            ambient: false,
            ambient_alpha: 0.08,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running(FrameHandle),
    Stopped,
}

pub struct RenderLoop {
    state: LoopState,
    sampler: SpectrumSampler,
    mapper: RingMapper,
    style: RenderStyle,
    frames_drawn: u64,
}

impl RenderLoop {
    pub fn new(mapper: RingMapper, style: RenderStyle, bin_count: usize) -> Self {
        Self {
            state: LoopState::Stopped,
            sampler: SpectrumSampler::new(bin_count),
            mapper,
            style,
            frames_drawn: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, LoopState::Running(_))
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn start(&mut self, scheduler: &mut dyn FrameScheduler) -> FrameHandle {
        if let LoopState::Running(handle) = self.state {
            return handle;
        }
        let handle = scheduler.request_frame();
        self.state = LoopState::Running(handle);
        handle
    }

    pub fn stop(&mut self, scheduler: &mut dyn FrameScheduler) {
        if let LoopState::Running(handle) = std::mem::replace(&mut self.state, LoopState::Stopped) {
            scheduler.cancel_frame(handle);
        }
    }

    /// Runs the callback for `fired`. Stale or cancelled handles draw
    /// nothing. With `active` false the frame is drawn from a flat spectrum.
    pub fn tick(
        &mut self,
        fired: FrameHandle,
        now_ms: f64,
        active: bool,
        scheduler: &mut dyn FrameScheduler,
        source: &mut dyn SpectrumSource,
        surface: &mut dyn Surface,
    ) -> bool {
        if self.state != LoopState::Running(fired) {
            return false;
        }
        // schedule first so a stop() from here on always has a handle to cancel
        self.state = LoopState::Running(scheduler.request_frame());

        let spectrum = if active {
            self.sampler.sample(source)
        } else {
            if source.is_suspended() {
                source.resume();
            }
            self.sampler.silence()
        };
        paint(&self.mapper, &self.style, spectrum, now_ms, surface);
        self.frames_drawn += 1;
        true
    }

    /// Paints one resting frame without touching the schedule.
    pub fn paint_idle(&mut self, now_ms: f64, surface: &mut dyn Surface) {
        let spectrum = self.sampler.silence();
        paint(&self.mapper, &self.style, spectrum, now_ms, surface);
    }
}

fn paint(
    mapper: &RingMapper,
    style: &RenderStyle,
    spectrum: &[u8],
    now_ms: f64,
    surface: &mut dyn Surface,
) {
    surface.wash(style.fade);

    if style.ambient {
        let g = mapper.geometry();
        let hue = mapper.hue(0, 0, now_ms);
        surface.radial_gradient(
            g.center,
            g.max_radius + mapper.tuning().pulse_scale,
            Hsla::new(hue, 0.6, 0.5, style.ambient_alpha),
        );
    }

    for e in mapper.elements(spectrum, now_ms) {
        surface.set_glow(Some(e.glow));
        surface.fill_circle(e.position, e.dot_radius, e.color);
    }
    surface.set_glow(None);
}
