use log::debug;

use super::analyser::{AnalyserConfig, AnalyserNode};
use super::context::{AudioContext, ContextState};
use super::sampler::SpectrumSource;
use crate::audio::{ElementId, MediaElement, MediaTap};
use crate::error::Result;

struct SourceNode {
    element: ElementId,
    tap: MediaTap,
}

/// Context, analyser and at most one media source, wired
/// source -> analyser -> output. The output leg is the element's own
/// playback; the graph only listens.
pub struct AnalysisGraph {
    context: AudioContext,
    analyser: AnalyserNode,
    source: Option<SourceNode>,
    scratch: Vec<f32>,
    sources_created: usize,
}

impl AnalysisGraph {
    pub fn new(context: AudioContext, config: &AnalyserConfig) -> Result<Self> {
        let analyser = AnalyserNode::new(*config)?;
        Ok(Self {
            context,
            scratch: Vec::with_capacity(analyser.fft_size()),
            analyser,
            source: None,
            sources_created: 0,
        })
    }

    /// Wraps `element` in a source node unless it is already the bound one.
    /// Returns whether a new source node was created. Binding a different
    /// element replaces the previous source.
    pub fn connect(&mut self, element: &mut dyn MediaElement) -> Result<bool> {
        let id = element.id();
        if self.is_bound_to(id) {
            return Ok(false);
        }
        let tap = element.capture_stream()?;
        debug!("analysis graph bound to audio element {id}");
        self.source = Some(SourceNode { element: id, tap });
        self.sources_created += 1;
        self.analyser.reset();
        Ok(true)
    }

    pub fn is_bound_to(&self, id: ElementId) -> bool {
        self.source.as_ref().is_some_and(|s| s.element == id)
    }

    pub fn bound_element(&self) -> Option<ElementId> {
        self.source.as_ref().map(|s| s.element)
    }

    pub fn sources_created(&self) -> usize {
        self.sources_created
    }

    pub fn context(&self) -> &AudioContext {
        &self.context
    }

    /// Forgets smoothed history and buffered audio, so the next frame is
    /// analysed from fresh samples only.
    pub fn reset(&mut self) {
        self.analyser.reset();
        if let Some(source) = self.source.as_mut() {
            source.tap.clear();
        }
    }

    pub fn close(&mut self) {
        self.source = None;
        self.context.close();
    }
}

impl SpectrumSource for AnalysisGraph {
    fn frequency_bin_count(&self) -> usize {
        self.analyser.frequency_bin_count()
    }

    fn is_suspended(&self) -> bool {
        self.context.state() == ContextState::Suspended
    }

    fn resume(&mut self) {
        self.context.resume();
    }

    fn byte_frequency_data(&mut self, out: &mut [u8]) {
        let Some(source) = self.source.as_mut() else {
            out.fill(0);
            return;
        };
        // keep the window current even when not analysing, so a resumed
        // context starts from fresh audio instead of a stale backlog
        source.tap.read_window(&mut self.scratch, self.analyser.fft_size());
        if self.context.state() != ContextState::Running {
            out.fill(0);
            return;
        }
        self.analyser.process(&self.scratch);
        self.analyser.byte_frequency_data(out);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::analysis::Activation;
    use crate::error::VisualizerError;
    use ringbuf::HeapProducer;

    /// Element fake that behaves like the platform: one capture only.
    pub(crate) struct FakeElement {
        pub id: ElementId,
        pub captures: usize,
        pub producer: Option<HeapProducer<f32>>,
        tap: Option<MediaTap>,
    }

    impl FakeElement {
        pub fn new() -> Self {
            let (producer, tap) = MediaTap::channel(4096);
            Self {
                id: ElementId::next(),
                captures: 0,
                producer: Some(producer),
                tap: Some(tap),
            }
        }

        pub fn feed(&mut self, samples: &[f32]) {
            if let Some(p) = self.producer.as_mut() {
                p.push_slice(samples);
            }
        }
    }

    impl MediaElement for FakeElement {
        fn id(&self) -> ElementId {
            self.id
        }

        fn capture_stream(&mut self) -> Result<MediaTap> {
            self.captures += 1;
            self.tap
                .take()
                .ok_or(VisualizerError::AlreadyCaptured(self.id))
        }
    }

    fn running_graph() -> AnalysisGraph {
        let activation = Activation::default();
        activation.grant();
        AnalysisGraph::new(AudioContext::new(44_100, activation), &AnalyserConfig::default())
            .unwrap()
    }

    fn tone(n: usize, bin: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * bin as f32 * i as f32 / 128.0).sin() * 0.5)
            .collect()
    }

    #[test]
    fn binding_twice_creates_one_source_node() {
        let mut graph = running_graph();
        let mut element = FakeElement::new();

        assert!(graph.connect(&mut element).unwrap());
        assert!(!graph.connect(&mut element).unwrap());

        assert_eq!(graph.sources_created(), 1);
        assert_eq!(element.captures, 1);
        assert_eq!(graph.bound_element(), Some(element.id));
    }

    #[test]
    fn an_already_captured_element_is_refused() {
        let mut element = FakeElement::new();
        let mut first = running_graph();
        first.connect(&mut element).unwrap();

        let mut second = running_graph();
        assert!(matches!(
            second.connect(&mut element),
            Err(VisualizerError::AlreadyCaptured(_))
        ));
        assert_eq!(second.bound_element(), None);
    }

    #[test]
    fn rebinding_to_another_element_replaces_the_source() {
        let mut graph = running_graph();
        let mut a = FakeElement::new();
        let mut b = FakeElement::new();

        graph.connect(&mut a).unwrap();
        assert!(graph.connect(&mut b).unwrap());
        assert!(graph.is_bound_to(b.id));
        assert!(!graph.is_bound_to(a.id));
        assert_eq!(graph.sources_created(), 2);
    }

    #[test]
    fn unbound_graph_reports_flat_spectrum() {
        let mut graph = running_graph();
        let mut out = vec![1u8; graph.frequency_bin_count()];
        graph.byte_frequency_data(&mut out);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn tapped_audio_reaches_the_spectrum() {
        let mut graph = running_graph();
        let mut element = FakeElement::new();
        graph.connect(&mut element).unwrap();
        element.feed(&tone(128, 8));

        let mut out = vec![0u8; graph.frequency_bin_count()];
        graph.byte_frequency_data(&mut out);
        assert!(out[8] > 200);
    }

    #[test]
    fn suspended_context_reports_flat_spectrum_until_resumed() {
        let activation = Activation::default();
        let mut graph = AnalysisGraph::new(
            AudioContext::new(44_100, activation.clone()),
            &AnalyserConfig::default(),
        )
        .unwrap();
        let mut element = FakeElement::new();
        graph.connect(&mut element).unwrap();
        element.feed(&tone(128, 8));

        let mut out = vec![0u8; 64];
        assert!(graph.is_suspended());
        graph.resume();
        graph.byte_frequency_data(&mut out);
        assert!(out.iter().all(|&b| b == 0));

        activation.grant();
        graph.resume();
        assert!(!graph.is_suspended());
        element.feed(&tone(128, 8));
        graph.byte_frequency_data(&mut out);
        assert!(out[8] > 200);
    }

    #[test]
    fn reset_drops_smoothed_and_buffered_audio() {
        let mut graph = running_graph();
        let mut element = FakeElement::new();
        graph.connect(&mut element).unwrap();
        element.feed(&tone(128, 8));
        let mut out = vec![0u8; graph.frequency_bin_count()];
        graph.byte_frequency_data(&mut out);
        assert!(out[8] > 200);

        element.feed(&tone(128, 8));
        graph.reset();
        graph.byte_frequency_data(&mut out);
        assert!(out.iter().all(|&b| b == 0));
        assert!(graph.is_bound_to(element.id));
    }

    #[test]
    fn close_releases_the_source() {
        let mut graph = running_graph();
        let mut element = FakeElement::new();
        graph.connect(&mut element).unwrap();
        graph.close();
        assert_eq!(graph.bound_element(), None);
        assert_eq!(graph.context().state(), ContextState::Closed);
        assert!(!graph.is_suspended());
    }
}
