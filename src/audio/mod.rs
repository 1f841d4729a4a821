#[cfg(feature = "native")]
mod cpal_backend;
mod offline;

#[cfg(feature = "native")]
pub use self::cpal_backend::CpalBackend;
pub use self::offline::OfflineBackend;

use crate::error::AudioError;
use crate::graph::Graph;

/// What the backend ended up opening.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub device_name: String,
}

pub trait AudioBackend {
    fn name(&self) -> &'static str;
    /// Takes ownership of the graph and starts pulling audio from it.
    fn start(&mut self, graph: Graph) -> Result<StreamInfo, AudioError>;
}
