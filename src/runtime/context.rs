use super::worklet::WorkletHost;
use crate::audio::{AudioBackend, OfflineBackend, StreamInfo};
use crate::config::EngineConfig;
use crate::error::AudioError;
use crate::graph::{Connection, Graph, GraphPort, GraphSnapshot, Source};
use tracing::info;

/// The open output: audio clock, graph entry point and worklet host.
///
/// Every play call creates its own nodes, so the context can be shared freely
/// between threads without further locking.
pub struct AudioContext {
    port: GraphPort,
    stream: StreamInfo,
    backend: &'static str,
    worklet: WorkletHost,
}

impl AudioContext {
    /// Starts `backend` with a fresh graph.
    pub fn open(config: &EngineConfig, backend: &mut dyn AudioBackend) -> Result<Self, AudioError> {
        let (graph, port) = Graph::new(config.master_volume);
        let stream = backend.start(graph)?;
        if stream.sample_rate == 0 {
            return Err(AudioError::AudioUnavailable(
                "backend reported a zero sample rate".into(),
            ));
        }
        info!(
            "Audio context ready: backend={}, device='{}', {} Hz, {} channel(s)",
            backend.name(),
            stream.device_name,
            stream.sample_rate,
            stream.channels
        );
        Ok(Self {
            port,
            stream,
            backend: backend.name(),
            worklet: WorkletHost::new(config.audio_worklet),
        })
    }

    /// Opens the platform output device.
    #[cfg(feature = "native")]
    pub fn system(config: &EngineConfig) -> Result<Self, AudioError> {
        let mut backend = crate::audio::CpalBackend::new(config);
        Self::open(config, &mut backend)
    }

    /// Opens a headless context; the returned backend drives rendering.
    pub fn offline(config: &EngineConfig, sample_rate: u32) -> Result<(Self, OfflineBackend), AudioError> {
        let backend = OfflineBackend::new(sample_rate);
        let context = Self::open(config, &mut backend.clone())?;
        Ok((context, backend))
    }

    pub fn sample_rate(&self) -> u32 {
        self.stream.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.stream.channels
    }

    pub fn device_name(&self) -> &str {
        &self.stream.device_name
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend
    }

    /// Seconds of audio rendered so far. All envelope events are scheduled
    /// against this clock.
    pub fn current_time(&self) -> f64 {
        self.port.frames_rendered() as f64 / self.stream.sample_rate as f64
    }

    pub fn connect(&self, source: Box<dyn Source>) -> Connection {
        self.port.connect(source)
    }

    pub fn connect_with(&self, source: Box<dyn Source>, link: Connection) {
        self.port.connect_with(source, link)
    }

    pub fn audio_worklet(&self) -> &WorkletHost {
        &self.worklet
    }

    pub fn stats(&self) -> GraphSnapshot {
        self.port.stats()
    }

    pub fn set_master_volume(&self, volume: f32) {
        self.port.set_master_volume(volume);
    }

    pub fn master_volume(&self) -> f32 {
        self.port.master_volume()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_advances_with_rendered_frames() {
        let (context, backend) = AudioContext::offline(&EngineConfig::default(), 48_000).unwrap();
        assert_eq!(context.current_time(), 0.0);
        backend.render(24_000);
        assert!((context.current_time() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn worklet_host_follows_config() {
        let config = EngineConfig {
            audio_worklet: false,
            ..EngineConfig::default()
        };
        let (context, _backend) = AudioContext::offline(&config, 48_000).unwrap();
        assert!(!context.audio_worklet().is_enabled());
    }
}
