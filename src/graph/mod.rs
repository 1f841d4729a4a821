//! Minimal audio graph: sources are handed to the audio thread over a channel,
//! mixed per render quantum, and dropped there once finished or disconnected.

pub mod gain;
pub mod param;
pub mod ring_buffer;

pub use gain::GainNode;
pub use param::{AudioParam, ParamEvent, ParamHandle, ParamTimeline};
pub use ring_buffer::{sample_ring, SampleConsumer, SampleProducer};

use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Frames rendered per graph step.
pub const RENDER_QUANTUM: usize = 128;

/// Position of the block being rendered.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderClock {
    /// Absolute index of the first frame in the block.
    pub frame: u64,
    pub sample_rate: f32,
}

impl RenderClock {
    pub fn new(frame: u64, sample_rate: f32) -> Self {
        Self { frame, sample_rate }
    }

    /// Context time in seconds of the frame at `offset` within the block.
    pub fn time_at(&self, offset: usize) -> f64 {
        (self.frame + offset as u64) as f64 / self.sample_rate as f64
    }

    pub fn advanced(&self, frames: usize) -> Self {
        Self {
            frame: self.frame + frames as u64,
            sample_rate: self.sample_rate,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Continuation {
    Continue,
    Finished,
}

/// A node that can be rendered by the graph.
pub trait Source: Send {
    /// Mixes the next block additively into `output` (mono).
    fn render(&mut self, output: &mut [f32], clock: &RenderClock) -> Continuation;
}

/// Handle to a connected source. Dropping it leaves the source connected;
/// only [`Connection::disconnect`] removes it early.
#[derive(Clone, Debug, Default)]
pub struct Connection {
    disconnected: Arc<AtomicBool>,
}

impl Connection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disconnect(&self) {
        self.disconnected.store(true, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        !self.disconnected.load(Ordering::Acquire)
    }
}

/// Lifetime counters for graph nodes.
#[derive(Debug, Default)]
pub struct GraphStats {
    connected: AtomicU64,
    released: AtomicU64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphSnapshot {
    pub connected: u64,
    pub released: u64,
}

impl GraphSnapshot {
    pub fn active(&self) -> u64 {
        self.connected - self.released
    }
}

impl GraphStats {
    pub fn snapshot(&self) -> GraphSnapshot {
        // Read `released` first so `active` can never underflow.
        let released = self.released.load(Ordering::Acquire);
        let connected = self.connected.load(Ordering::Acquire);
        GraphSnapshot {
            connected,
            released,
        }
    }
}

struct Entry {
    source: Box<dyn Source>,
    link: Connection,
}

/// Control-thread side of the graph.
#[derive(Clone)]
pub struct GraphPort {
    sender: Sender<Entry>,
    frames: Arc<AtomicU64>,
    stats: Arc<GraphStats>,
    master_volume: Arc<AtomicU32>,
}

impl GraphPort {
    pub fn connect(&self, source: Box<dyn Source>) -> Connection {
        let link = Connection::new();
        self.connect_with(source, link.clone());
        link
    }

    /// Connects a source using a link created up front, for sources whose
    /// helpers need to observe disconnection.
    pub fn connect_with(&self, source: Box<dyn Source>, link: Connection) {
        self.stats.connected.fetch_add(1, Ordering::AcqRel);
        if self.sender.send(Entry { source, link }).is_err() {
            // Graph is gone; count the node as released straight away.
            self.stats.released.fetch_add(1, Ordering::AcqRel);
        }
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> GraphSnapshot {
        self.stats.snapshot()
    }

    pub fn set_master_volume(&self, volume: f32) {
        self.master_volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Release);
    }

    pub fn master_volume(&self) -> f32 {
        f32::from_bits(self.master_volume.load(Ordering::Acquire))
    }
}

/// Audio-thread side of the graph. Owned by the backend's callback.
pub struct Graph {
    entries: Vec<Entry>,
    incoming: Receiver<Entry>,
    frames: Arc<AtomicU64>,
    stats: Arc<GraphStats>,
    master_volume: Arc<AtomicU32>,
}

impl Graph {
    pub fn new(master_volume: f32) -> (Self, GraphPort) {
        let (sender, incoming) = crossbeam_channel::unbounded();
        let frames = Arc::new(AtomicU64::new(0));
        let stats = Arc::new(GraphStats::default());
        let master_volume = Arc::new(AtomicU32::new(master_volume.clamp(0.0, 1.0).to_bits()));
        let graph = Self {
            entries: Vec::with_capacity(64),
            incoming,
            frames: frames.clone(),
            stats: stats.clone(),
            master_volume: master_volume.clone(),
        };
        let port = GraphPort {
            sender,
            frames,
            stats,
            master_volume,
        };
        (graph, port)
    }

    pub fn active_sources(&self) -> usize {
        self.entries.len()
    }

    /// Renders `output.len()` mono frames, overwriting `output`.
    pub fn process(&mut self, output: &mut [f32], sample_rate: f32) {
        output.fill(0.0);
        while let Ok(entry) = self.incoming.try_recv() {
            self.entries.push(entry);
        }

        for block in output.chunks_mut(RENDER_QUANTUM) {
            let clock = RenderClock::new(self.frames.load(Ordering::Acquire), sample_rate);
            let mut index = 0;
            while index < self.entries.len() {
                let entry = &mut self.entries[index];
                let keep = entry.link.is_connected()
                    && entry.source.render(block, &clock) == Continuation::Continue;
                if keep {
                    index += 1;
                } else {
                    entry.link.disconnect();
                    self.entries.swap_remove(index);
                    self.stats.released.fetch_add(1, Ordering::AcqRel);
                    debug!("Graph node released");
                }
            }
            self.frames
                .fetch_add(block.len() as u64, Ordering::AcqRel);
        }

        let master = f32::from_bits(self.master_volume.load(Ordering::Acquire));
        for sample in output.iter_mut() {
            *sample *= master;
        }
        Self::apply_limiter(output);
    }

    fn apply_limiter(output: &mut [f32]) {
        // Soft knee above 0.9
        for sample in output.iter_mut() {
            let abs_sample = sample.abs();
            if abs_sample > 0.9 {
                *sample *= (1.9 - abs_sample).max(0.0);
            }
        }
    }
}
