//! The mounted visualizer: owns the analysis graph and render loop for one
//! drawing surface, and follows the host's element and current song.

use log::{debug, warn};

use crate::analysis::{AnalyserConfig, AnalysisGraph, AudioContext};
use crate::audio::{ElementId, MediaElement};
use crate::error::Result;
use crate::visual::{
    FrameHandle, FrameScheduler, RenderLoop, RenderStyle, RingMapper, RingSpec, RingTuning,
    Surface,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualizerConfig {
    pub width: f32,
    pub height: f32,
    pub rings: RingSpec,
    pub tuning: RingTuning,
    pub analyser: AnalyserConfig,
    pub style: RenderStyle,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            width: 352.0,
            height: 352.0,
            rings: RingSpec::default(),
            tuning: RingTuning::default(),
            analyser: AnalyserConfig::default(),
            style: RenderStyle::default(),
        }
    }
}

/// Creates the audio context on first use.
pub type ContextOpener = Box<dyn FnMut() -> Result<AudioContext>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Mounted, loop not running (no element yet, or it could not be bound).
    Waiting,
    Active,
    /// No analysis possible here; a static idle frame is all that is drawn.
    Unsupported,
    Unmounted,
}

pub struct Visualizer {
    analyser: AnalyserConfig,
    open_context: ContextOpener,
    graph: Option<AnalysisGraph>,
    render_loop: RenderLoop,
    current_song: Option<String>,
    unsupported: bool,
    refused: Option<ElementId>,
    idle_pending: bool,
    mounted: bool,
}

impl Visualizer {
    pub fn new(config: &VisualizerConfig, open_context: ContextOpener) -> Self {
        let mapper = RingMapper::new(config.rings, config.tuning, config.width, config.height);
        Self {
            analyser: config.analyser,
            open_context,
            graph: None,
            render_loop: RenderLoop::new(
                mapper,
                config.style,
                config.analyser.frequency_bin_count(),
            ),
            current_song: None,
            unsupported: false,
            refused: None,
            idle_pending: true,
            mounted: true,
        }
    }

    pub fn status(&self) -> Status {
        if !self.mounted {
            Status::Unmounted
        } else if self.unsupported {
            Status::Unsupported
        } else if self.render_loop.is_running() {
            Status::Active
        } else {
            Status::Waiting
        }
    }

    pub fn current_song(&self) -> Option<&str> {
        self.current_song.as_deref()
    }

    pub fn graph(&self) -> Option<&AnalysisGraph> {
        self.graph.as_ref()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.render_loop.frames_drawn()
    }

    /// Brings the wiring in line with the host's current element and song.
    /// Cheap when nothing changed; call it every update. The graph is keyed
    /// on element identity only, so a track change never rewires anything.
    pub fn sync(
        &mut self,
        element: Option<&mut dyn MediaElement>,
        song: Option<&str>,
        scheduler: &mut dyn FrameScheduler,
    ) {
        if !self.mounted {
            return;
        }
        let reactivated = self.current_song.is_none() && song.is_some();
        if self.current_song.as_deref() != song {
            debug!("visualizer song: {:?} -> {:?}", self.current_song, song);
            self.current_song = song.map(str::to_owned);
        }
        if reactivated {
            // whatever piled up while resting must not flash on screen
            if let Some(graph) = self.graph.as_mut() {
                graph.reset();
            }
        }
        if self.unsupported {
            return;
        }
        let Some(element) = element else {
            return;
        };
        let id = element.id();
        if self.refused == Some(id) {
            return;
        }

        if self.graph.is_none() {
            match (self.open_context)().and_then(|ctx| AnalysisGraph::new(ctx, &self.analyser)) {
                Ok(graph) => {
                    debug!(
                        "analysis graph created at {} Hz",
                        graph.context().sample_rate()
                    );
                    self.graph = Some(graph);
                }
                Err(e) => {
                    warn!("visualizer stays idle: {e}");
                    self.unsupported = true;
                    self.idle_pending = true;
                    return;
                }
            }
        }
        let Some(graph) = self.graph.as_mut() else {
            return;
        };

        if !graph.is_bound_to(id) {
            // the pending frame belongs to the old wiring
            self.render_loop.stop(scheduler);
            if let Err(e) = graph.connect(element) {
                warn!("visualizer cannot listen to element {id}: {e}");
                self.refused = Some(id);
                self.idle_pending = true;
                return;
            }
        }
        self.render_loop.start(scheduler);
    }

    /// Handles one display refresh. `due` is the callback the scheduler
    /// fired, if any. Returns whether anything was drawn.
    pub fn frame(
        &mut self,
        due: Option<FrameHandle>,
        now_ms: f64,
        scheduler: &mut dyn FrameScheduler,
        surface: &mut dyn Surface,
    ) -> bool {
        if !self.mounted {
            return false;
        }
        if let (Some(handle), Some(graph)) = (due, self.graph.as_mut()) {
            let active = self.current_song.is_some();
            if self
                .render_loop
                .tick(handle, now_ms, active, scheduler, graph, surface)
            {
                self.idle_pending = false;
                return true;
            }
        }
        if self.idle_pending && !self.render_loop.is_running() {
            self.render_loop.paint_idle(now_ms, surface);
            self.idle_pending = false;
            return true;
        }
        false
    }

    /// Cancels the scheduled frame and releases the analysis graph.
    pub fn unmount(&mut self, scheduler: &mut dyn FrameScheduler) {
        self.render_loop.stop(scheduler);
        if let Some(mut graph) = self.graph.take() {
            graph.close();
        }
        self.mounted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Activation;
    use crate::analysis::graph::tests::FakeElement;
    use crate::error::VisualizerError;
    use crate::visual::FrameQueue;
    use crate::visual::surface::RecordingSurface;
    use std::cell::Cell;
    use std::rc::Rc;

    fn opener(opened: Rc<Cell<usize>>) -> ContextOpener {
        Box::new(move || {
            opened.set(opened.get() + 1);
            let activation = Activation::default();
            activation.grant();
            Ok(AudioContext::new(44_100, activation))
        })
    }

    fn visualizer() -> Visualizer {
        Visualizer::new(&VisualizerConfig::default(), opener(Rc::new(Cell::new(0))))
    }

    fn tone() -> Vec<f32> {
        (0..128)
            .map(|i| (2.0 * std::f32::consts::PI * 3.0 * i as f32 / 128.0).sin() * 0.5)
            .collect()
    }

    fn run_frame(
        vis: &mut Visualizer,
        queue: &mut FrameQueue,
        surface: &mut RecordingSurface,
    ) -> bool {
        let due = queue.take_due();
        vis.frame(due, 0.0, queue, surface)
    }

    #[test]
    fn idle_frame_is_painted_once_before_any_element() {
        let mut vis = visualizer();
        let mut queue = FrameQueue::new();
        let mut surface = RecordingSurface::default();

        vis.sync(None, None, &mut queue);
        assert_eq!(vis.status(), Status::Waiting);
        assert!(run_frame(&mut vis, &mut queue, &mut surface));
        assert!(!run_frame(&mut vis, &mut queue, &mut surface));
        assert_eq!(surface.washes, 1);
        assert!(vis.graph().is_none());
    }

    #[test]
    fn unsupported_environment_never_starts_the_loop() {
        let attempts = Rc::new(Cell::new(0));
        let counter = Rc::clone(&attempts);
        let mut vis = Visualizer::new(
            &VisualizerConfig::default(),
            Box::new(move || {
                counter.set(counter.get() + 1);
                Err(VisualizerError::Unsupported("no audio output device".into()))
            }),
        );
        let mut queue = FrameQueue::new();
        let mut surface = RecordingSurface::default();
        let mut element = FakeElement::new();

        for _ in 0..3 {
            vis.sync(Some(&mut element), Some("song"), &mut queue);
            run_frame(&mut vis, &mut queue, &mut surface);
        }
        assert_eq!(vis.status(), Status::Unsupported);
        assert_eq!(attempts.get(), 1);
        assert!(!queue.is_pending());
        assert_eq!(element.captures, 0);
        assert_eq!(surface.washes, 1);
        assert_eq!(surface.circles.len(), 88);
    }

    #[test]
    fn invalid_analyser_config_is_treated_as_unsupported() {
        let config = VisualizerConfig {
            analyser: AnalyserConfig {
                fft_size: 100,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut vis = Visualizer::new(&config, opener(Rc::new(Cell::new(0))));
        let mut queue = FrameQueue::new();
        let mut element = FakeElement::new();
        vis.sync(Some(&mut element), None, &mut queue);
        assert_eq!(vis.status(), Status::Unsupported);
    }

    #[test]
    fn song_changes_reuse_the_same_graph_and_source() {
        let opened = Rc::new(Cell::new(0));
        let mut vis = Visualizer::new(&VisualizerConfig::default(), opener(Rc::clone(&opened)));
        let mut queue = FrameQueue::new();
        let mut surface = RecordingSurface::default();
        let mut element = FakeElement::new();

        for song in [Some("one"), Some("two"), None, Some("three")] {
            vis.sync(Some(&mut element), song, &mut queue);
            assert!(run_frame(&mut vis, &mut queue, &mut surface));
            assert_eq!(vis.current_song(), song);
        }
        assert_eq!(opened.get(), 1);
        assert_eq!(vis.graph().map(|g| g.context().sample_rate()), Some(44_100));
        assert_eq!(element.captures, 1);
        assert_eq!(vis.graph().map(|g| g.sources_created()), Some(1));
        assert_eq!(vis.status(), Status::Active);
        assert_eq!(vis.frames_drawn(), 4);
    }

    #[test]
    fn playing_audio_moves_the_field_and_no_song_rests_it() {
        let mut vis = visualizer();
        let mut queue = FrameQueue::new();
        let mut surface = RecordingSurface::default();
        let mut element = FakeElement::new();

        vis.sync(Some(&mut element), Some("song"), &mut queue);
        element.feed(&tone());
        run_frame(&mut vis, &mut queue, &mut surface);
        assert!(surface.circles.iter().any(|c| c.1 > 2.2));

        surface.circles.clear();
        vis.sync(Some(&mut element), None, &mut queue);
        element.feed(&tone());
        run_frame(&mut vis, &mut queue, &mut surface);
        assert!(surface.circles.iter().all(|c| c.1 == 2.2));
    }

    #[test]
    fn returning_song_starts_from_a_clean_spectrum() {
        let mut vis = visualizer();
        let mut queue = FrameQueue::new();
        let mut surface = RecordingSurface::default();
        let mut element = FakeElement::new();

        vis.sync(Some(&mut element), Some("one"), &mut queue);
        element.feed(&tone());
        run_frame(&mut vis, &mut queue, &mut surface);
        assert!(surface.circles.iter().any(|c| c.1 > 2.2));

        vis.sync(Some(&mut element), None, &mut queue);
        element.feed(&tone());
        run_frame(&mut vis, &mut queue, &mut surface);

        surface.circles.clear();
        vis.sync(Some(&mut element), Some("two"), &mut queue);
        run_frame(&mut vis, &mut queue, &mut surface);
        assert_eq!(surface.circles.len(), 88);
        assert!(surface.circles.iter().all(|c| c.1 == 2.2));
    }

    #[test]
    fn no_draws_after_unmount() {
        let mut vis = visualizer();
        let mut queue = FrameQueue::new();
        let mut surface = RecordingSurface::default();
        let mut element = FakeElement::new();

        vis.sync(Some(&mut element), Some("song"), &mut queue);
        for _ in 0..5 {
            run_frame(&mut vis, &mut queue, &mut surface);
        }
        let before = surface.draw_calls();
        assert!(before > 0);
        let stale = queue.take_due();
        assert!(stale.is_some());

        vis.unmount(&mut queue);
        assert_eq!(vis.status(), Status::Unmounted);
        assert!(!queue.is_pending());
        assert!(vis.graph().is_none());

        vis.sync(Some(&mut element), Some("song"), &mut queue);
        for _ in 0..5 {
            run_frame(&mut vis, &mut queue, &mut surface);
        }
        assert!(!vis.frame(stale, 0.0, &mut queue, &mut surface));
        assert_eq!(surface.draw_calls(), before);
        assert!(!queue.is_pending());
    }

    #[test]
    fn switching_elements_cancels_the_old_frame_and_rebinds() {
        let mut vis = visualizer();
        let mut queue = FrameQueue::new();
        let mut surface = RecordingSurface::default();
        let mut a = FakeElement::new();
        let mut b = FakeElement::new();

        vis.sync(Some(&mut a), Some("song"), &mut queue);
        run_frame(&mut vis, &mut queue, &mut surface);
        let old = queue.take_due().unwrap();

        vis.sync(Some(&mut b), Some("song"), &mut queue);
        assert!(queue.is_pending());
        assert!(!vis.frame(Some(old), 0.0, &mut queue, &mut surface));
        assert!(run_frame(&mut vis, &mut queue, &mut surface));

        let graph = vis.graph().unwrap();
        assert!(graph.is_bound_to(b.id));
        assert_eq!(graph.sources_created(), 2);
        assert_eq!(a.captures, 1);
        assert_eq!(b.captures, 1);
    }

    #[test]
    fn an_element_captured_elsewhere_leaves_the_visualizer_idle() {
        let mut vis = visualizer();
        let mut queue = FrameQueue::new();
        let mut surface = RecordingSurface::default();
        let mut element = FakeElement::new();
        let _elsewhere = element.capture_stream().unwrap();

        for _ in 0..3 {
            vis.sync(Some(&mut element), Some("song"), &mut queue);
            run_frame(&mut vis, &mut queue, &mut surface);
        }
        assert_eq!(vis.status(), Status::Waiting);
        assert_eq!(element.captures, 2);
        assert!(!queue.is_pending());
        assert_eq!(surface.washes, 1);
    }
}
