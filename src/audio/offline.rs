use super::{AudioBackend, StreamInfo};
use crate::error::AudioError;
use crate::graph::Graph;
use parking_lot::Mutex;
use std::sync::Arc;

/// Headless backend: nothing is rendered until the owner pulls frames.
///
/// Clones share the same graph, so a test can keep one handle while the
/// context factory consumes another.
#[derive(Clone)]
pub struct OfflineBackend {
    sample_rate: u32,
    graph: Arc<Mutex<Option<Graph>>>,
}

impl OfflineBackend {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            graph: Arc::new(Mutex::new(None)),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_started(&self) -> bool {
        self.graph.lock().is_some()
    }

    /// Renders `frames` mono samples. Returns silence before `start`.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut output = vec![0.0; frames];
        self.render_into(&mut output);
        output
    }

    pub fn render_into(&self, output: &mut [f32]) {
        match self.graph.lock().as_mut() {
            Some(graph) => graph.process(output, self.sample_rate as f32),
            None => output.fill(0.0),
        }
    }

    /// Renders `seconds` of audio, discarding it.
    pub fn advance(&self, seconds: f64) {
        let frames = (seconds * self.sample_rate as f64).round() as usize;
        let mut scratch = vec![0.0; 1024];
        let mut remaining = frames;
        while remaining > 0 {
            let n = remaining.min(scratch.len());
            self.render_into(&mut scratch[..n]);
            remaining -= n;
        }
    }
}

impl AudioBackend for OfflineBackend {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn start(&mut self, graph: Graph) -> Result<StreamInfo, AudioError> {
        let mut slot = self.graph.lock();
        if slot.is_some() {
            return Err(AudioError::AudioUnavailable(
                "offline backend already started".into(),
            ));
        }
        *slot = Some(graph);
        Ok(StreamInfo {
            sample_rate: self.sample_rate,
            channels: 1,
            device_name: "offline".into(),
        })
    }
}
