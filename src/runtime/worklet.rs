//! Real-time renderer modules.
//!
//! A module is addressed by a well-known path and registers one or more named
//! processors. Nodes created from those processors render directly on the
//! audio thread, inside the graph callback.

use crate::error::AudioError;
use crate::graph::{AudioParam, Continuation, ParamHandle, RenderClock, Source, RENDER_QUANTUM};
use crate::synth::noise::{Amplitude, NoiseRenderer, WorkletRenderer, DEFAULT_AMPLITUDE};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

pub const NOISE_PROCESSOR_MODULE: &str = "processors/white-noise-processor";
pub const NOISE_PROCESSOR_NAME: &str = "white-noise-processor";

pub type ProcessorFactory = fn() -> Box<dyn NoiseRenderer>;

fn white_noise_processor() -> Box<dyn NoiseRenderer> {
    Box::new(WorkletRenderer::new())
}

pub struct WorkletHost {
    enabled: bool,
    catalog: RwLock<HashMap<String, Vec<(String, ProcessorFactory)>>>,
    loaded: RwLock<HashSet<String>>,
    processors: RwLock<HashMap<String, ProcessorFactory>>,
}

impl WorkletHost {
    /// Host with the built-in noise module available.
    pub fn new(enabled: bool) -> Self {
        let host = Self {
            enabled,
            catalog: RwLock::new(HashMap::new()),
            loaded: RwLock::new(HashSet::new()),
            processors: RwLock::new(HashMap::new()),
        };
        host.define_module(
            NOISE_PROCESSOR_MODULE,
            &[(NOISE_PROCESSOR_NAME, white_noise_processor as ProcessorFactory)],
        );
        host
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Makes a module available for loading under `path`.
    pub fn define_module(&self, path: &str, processors: &[(&str, ProcessorFactory)]) {
        let entries = processors
            .iter()
            .map(|(name, factory)| (name.to_string(), *factory))
            .collect();
        self.catalog.write().insert(path.to_string(), entries);
    }

    /// Loads the module at `path`, registering its processors. Loading an
    /// already loaded module is a no-op.
    pub fn add_module(&self, path: &str) -> Result<(), AudioError> {
        if !self.enabled {
            return Err(AudioError::module_load(path, "audio worklets are disabled"));
        }
        if self.loaded.read().contains(path) {
            return Ok(());
        }

        let catalog = self.catalog.read();
        let processors = catalog
            .get(path)
            .ok_or_else(|| AudioError::module_load(path, "no module at this path"))?;

        let mut registered = self.processors.write();
        for (name, factory) in processors {
            registered.insert(name.clone(), *factory);
            debug!("Registered processor '{}'", name);
        }
        self.loaded.write().insert(path.to_string());
        info!("Loaded renderer module '{}'", path);
        Ok(())
    }

    pub fn is_loaded(&self, path: &str) -> bool {
        self.loaded.read().contains(path)
    }

    /// Instantiates a node for a processor registered by a loaded module.
    pub fn create_node(&self, name: &str) -> Result<WorkletNode, AudioError> {
        let factory = self.processors.read().get(name).copied().ok_or_else(|| {
            AudioError::module_load(name, "processor not registered by any loaded module")
        })?;
        Ok(WorkletNode::new(factory()))
    }
}

/// Graph node hosting a processor on the audio thread. Exposes an
/// `amplitude` parameter (default 0.08, clamped to 0..=1).
pub struct WorkletNode {
    processor: Box<dyn NoiseRenderer>,
    amplitude: AudioParam,
    values: [f32; RENDER_QUANTUM],
    block: [f32; RENDER_QUANTUM],
}

impl WorkletNode {
    pub fn new(processor: Box<dyn NoiseRenderer>) -> Self {
        Self {
            processor,
            amplitude: AudioParam::new(DEFAULT_AMPLITUDE),
            values: [0.0; RENDER_QUANTUM],
            block: [0.0; RENDER_QUANTUM],
        }
    }

    pub fn amplitude(&self) -> ParamHandle {
        self.amplitude.handle()
    }
}

impl Source for WorkletNode {
    fn render(&mut self, output: &mut [f32], clock: &RenderClock) -> Continuation {
        self.amplitude.sync();
        let mut state = Continuation::Continue;
        let mut offset = 0;
        for chunk in output.chunks_mut(RENDER_QUANTUM) {
            let n = chunk.len();
            let chunk_clock = clock.advanced(offset);
            let block = &mut self.block[..n];

            let start = chunk_clock.time_at(0);
            let amplitude = if self.amplitude.timeline().is_settled_at(start) {
                Amplitude::Scalar(self.amplitude.value_at(start))
            } else {
                let values = &mut self.values[..n];
                self.amplitude.fill(values, &chunk_clock);
                Amplitude::PerSample(&*values)
            };
            if self.processor.render(block, amplitude) == Continuation::Finished {
                state = Continuation::Finished;
            }

            for (out, sample) in chunk.iter_mut().zip(block.iter()) {
                *out += *sample;
            }
            offset += n;
        }
        if state == Continuation::Finished {
            debug!("Worklet processor finished on its own");
        }
        state
    }
}
