use crate::error::ConfigError;
use crate::runtime::worklet::NOISE_PROCESSOR_MODULE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What happens when an ambient session is started while another is still playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapPolicy {
    /// Fade the running session out quickly and tear it down before the new one plays.
    Restart,
    /// Let sessions run side by side, each with its own gain ramp.
    Overlap,
}

/// Engine settings. Everything here is consumed, never produced, by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output device name; `None` picks the platform default.
    pub output_device: Option<String>,
    /// Preferred sample rate in Hz; `None` keeps the device default.
    pub sample_rate: Option<u32>,
    /// Fixed hardware buffer size in frames; `None` lets the host decide.
    pub buffer_size: Option<u32>,
    /// Master output level (0.0 to 1.0)
    pub master_volume: f32,
    /// Whether the real-time worklet path may be used for ambient noise.
    pub audio_worklet: bool,
    /// Well-known path of the noise renderer module.
    pub noise_module: String,
    pub ambient_overlap: OverlapPolicy,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.master_volume) {
            return Err(ConfigError::Invalid(format!(
                "master_volume must be within 0.0..=1.0, got {}",
                self.master_volume
            )));
        }
        if self.sample_rate == Some(0) {
            return Err(ConfigError::Invalid("sample_rate must be positive".into()));
        }
        if self.buffer_size == Some(0) {
            return Err(ConfigError::Invalid("buffer_size must be positive".into()));
        }
        if self.noise_module.trim().is_empty() {
            return Err(ConfigError::Invalid("noise_module must not be empty".into()));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            output_device: None,
            sample_rate: None,
            buffer_size: None,
            master_volume: 1.0,
            audio_worklet: true,
            noise_module: NOISE_PROCESSOR_MODULE.to_string(),
            ambient_overlap: OverlapPolicy::Restart,
        }
    }
}
