//! White-noise renderers.
//!
//! Both renderers fulfil the same contract; they differ only in where they
//! run. [`WorkletRenderer`] is hosted by a worklet node on the audio thread,
//! [`FallbackRenderer`] runs on its own best-effort thread in fixed
//! 4096-sample blocks and hands them to the graph through a ring buffer.

use crate::error::AudioError;
use crate::graph::{
    sample_ring, Connection, Continuation, RenderClock, SampleConsumer, Source, RENDER_QUANTUM,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error};

/// Quiet noise floor used when no amplitude is given.
pub const DEFAULT_AMPLITUDE: f32 = 0.08;
/// Block size of the buffered fallback callback.
pub const FALLBACK_BLOCK_SIZE: usize = 4096;
/// Blocks the fallback keeps queued ahead of the audio callback.
const FALLBACK_QUEUED_BLOCKS: usize = 2;

/// Amplitude control for one render block: a single value or one per sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Amplitude<'a> {
    Scalar(f32),
    PerSample(&'a [f32]),
}

impl Amplitude<'_> {
    /// Amplitude for sample `index`, clamped to 0..=1. A short per-sample
    /// array repeats its last value.
    pub fn at(&self, index: usize) -> f32 {
        let value = match *self {
            Amplitude::Scalar(value) => value,
            Amplitude::PerSample(values) => match values.len() {
                0 => DEFAULT_AMPLITUDE,
                len => values[index.min(len - 1)],
            },
        };
        value.clamp(0.0, 1.0)
    }
}

impl Default for Amplitude<'_> {
    fn default() -> Self {
        Amplitude::Scalar(DEFAULT_AMPLITUDE)
    }
}

/// Fills a block with scaled uniform noise. Constant work per sample, no
/// allocation after construction.
pub trait NoiseRenderer: Send {
    /// Overwrites `output`. Always returns [`Continuation::Continue`]; the
    /// owner ends playback by disconnecting.
    fn render(&mut self, output: &mut [f32], amplitude: Amplitude<'_>) -> Continuation;
}

/// Uniform sample source in -1.0..=1.0.
pub struct WhiteNoise {
    rng: SmallRng,
}

impl WhiteNoise {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_rng(&mut rand::rng()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        self.rng.random_range(-1.0f32..=1.0)
    }

    pub fn fill(&mut self, output: &mut [f32], amplitude: Amplitude<'_>) {
        for (i, sample) in output.iter_mut().enumerate() {
            *sample = self.next_sample() * amplitude.at(i);
        }
    }
}

impl Default for WhiteNoise {
    fn default() -> Self {
        Self::new()
    }
}

/// Noise processor for the real-time worklet path.
pub struct WorkletRenderer {
    noise: WhiteNoise,
}

impl WorkletRenderer {
    pub fn new() -> Self {
        Self::with_noise(WhiteNoise::new())
    }

    pub fn with_noise(noise: WhiteNoise) -> Self {
        Self { noise }
    }
}

impl Default for WorkletRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl NoiseRenderer for WorkletRenderer {
    fn render(&mut self, output: &mut [f32], amplitude: Amplitude<'_>) -> Continuation {
        self.noise.fill(output, amplitude);
        Continuation::Continue
    }
}

/// Noise processor for the buffered fallback path.
pub struct FallbackRenderer {
    noise: WhiteNoise,
}

impl FallbackRenderer {
    pub fn new() -> Self {
        Self::with_noise(WhiteNoise::new())
    }

    pub fn with_noise(noise: WhiteNoise) -> Self {
        Self { noise }
    }

    /// Starts the block callback thread and returns the graph node that plays
    /// its output, plus a handle on the thread. The thread exits once `link`
    /// is disconnected.
    pub fn spawn(mut self, link: Connection) -> Result<(BufferedNoiseNode, FallbackWorker), AudioError> {
        let (mut producer, consumer) = sample_ring(FALLBACK_BLOCK_SIZE * FALLBACK_QUEUED_BLOCKS);

        let thread = std::thread::Builder::new()
            .name("noise-fallback".into())
            .spawn(move || {
                let mut block = vec![0.0f32; FALLBACK_BLOCK_SIZE];
                while link.is_connected() {
                    if producer.vacant_len() >= FALLBACK_BLOCK_SIZE {
                        self.render(&mut block, Amplitude::default());
                        producer.push_slice(&block);
                    } else {
                        std::thread::sleep(Duration::from_millis(5));
                    }
                }
                debug!("Fallback noise callback stopped");
            })
            .map_err(|e| {
                error!("Failed to start fallback noise thread: {}", e);
                AudioError::RenderFailure(e.to_string())
            })?;

        let node = BufferedNoiseNode {
            consumer,
            block: [0.0; RENDER_QUANTUM],
        };
        Ok((node, FallbackWorker { thread }))
    }
}

/// Handle on a running fallback callback thread.
pub struct FallbackWorker {
    thread: JoinHandle<()>,
}

impl FallbackWorker {
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

impl Default for FallbackRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl NoiseRenderer for FallbackRenderer {
    fn render(&mut self, output: &mut [f32], amplitude: Amplitude<'_>) -> Continuation {
        self.noise.fill(output, amplitude);
        Continuation::Continue
    }
}

/// Graph side of the fallback path. Plays silence on underrun.
pub struct BufferedNoiseNode {
    consumer: SampleConsumer,
    block: [f32; RENDER_QUANTUM],
}

impl BufferedNoiseNode {
    /// Samples queued by the callback thread and not yet played.
    pub fn buffered(&self) -> usize {
        self.consumer.len()
    }
}

impl Source for BufferedNoiseNode {
    fn render(&mut self, output: &mut [f32], _clock: &RenderClock) -> Continuation {
        for chunk in output.chunks_mut(RENDER_QUANTUM) {
            let block = &mut self.block[..chunk.len()];
            let read = self.consumer.pop_slice(block);
            for (out, sample) in chunk.iter_mut().zip(block[..read].iter()) {
                *out += *sample;
            }
        }
        Continuation::Continue
    }
}
