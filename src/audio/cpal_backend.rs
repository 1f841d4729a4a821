use super::{AudioBackend, StreamInfo};
use crate::config::EngineConfig;
use crate::error::AudioError;
use crate::graph::Graph;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream};
use tracing::{error, info, warn};

/// Plays the graph on a system output device.
///
/// `cpal::Stream` is not `Send`, so the stream is built on, and stays owned by,
/// a dedicated `audio-output` thread that lives as long as the process.
pub struct CpalBackend {
    output_device: Option<String>,
    sample_rate: Option<u32>,
    buffer_size: Option<u32>,
}

impl CpalBackend {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            output_device: config.output_device.clone(),
            sample_rate: config.sample_rate,
            buffer_size: config.buffer_size,
        }
    }

    fn select_output_device(&self, host: &cpal::Host) -> Result<cpal::Device, AudioError> {
        if let Some(wanted) = &self.output_device {
            let found = host
                .output_devices()
                .map_err(|e| AudioError::AudioUnavailable(e.to_string()))?
                .find(|d| d.name().map(|n| n == *wanted).unwrap_or(false));
            match found {
                Some(device) => return Ok(device),
                None => warn!("Output device '{}' not found, using default", wanted),
            }
        }

        if cfg!(target_os = "linux") {
            if let Some(device) = Self::select_linux_output_device(host) {
                return Ok(device);
            }
        }

        host.default_output_device()
            .ok_or_else(|| AudioError::AudioUnavailable("No output device available".into()))
    }

    fn select_linux_output_device(host: &cpal::Host) -> Option<cpal::Device> {
        host.output_devices().ok()?.find(|device| {
            let name = device.name().unwrap_or_default().to_lowercase();
            name.starts_with("default:") || name.contains("pipewire")
        })
    }

    fn select_stream_config(
        &self,
        device: &cpal::Device,
    ) -> Result<cpal::SupportedStreamConfig, AudioError> {
        if let Some(rate) = self.sample_rate {
            let wanted = cpal::SampleRate(rate);
            let ranges = device
                .supported_output_configs()
                .map_err(|e| AudioError::AudioUnavailable(e.to_string()))?;
            for range in ranges {
                if range.sample_format() == SampleFormat::F32
                    && range.min_sample_rate() <= wanted
                    && range.max_sample_rate() >= wanted
                {
                    return Ok(range.with_sample_rate(wanted));
                }
            }
            warn!("Sample rate {} Hz not supported, using device default", rate);
        }

        device
            .default_output_config()
            .map_err(|e| AudioError::AudioUnavailable(e.to_string()))
    }

    fn build_stream(&self, mut graph: Graph) -> Result<(Stream, StreamInfo), AudioError> {
        let host = cpal::default_host();
        let device = self.select_output_device(&host)?;
        let device_name = device.name().unwrap_or_default();
        info!("Selected device: {}", device_name);

        let supported_config = self.select_stream_config(&device)?;
        if supported_config.sample_format() != SampleFormat::F32 {
            return Err(AudioError::AudioUnavailable(format!(
                "Unsupported sample format {:?}",
                supported_config.sample_format()
            )));
        }

        let mut stream_config: cpal::StreamConfig = supported_config.into();
        if let Some(frames) = self.buffer_size {
            stream_config.buffer_size = cpal::BufferSize::Fixed(frames);
        }

        let sample_rate = stream_config.sample_rate.0;
        let channels = stream_config.channels as usize;
        let mut mono: Vec<f32> = Vec::with_capacity(8192);

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels;
                    if mono.len() < frames {
                        mono.resize(frames, 0.0);
                    }
                    let buffer = &mut mono[..frames];
                    graph.process(buffer, sample_rate as f32);

                    for (frame, value) in data.chunks_mut(channels).zip(buffer.iter()) {
                        for sample in frame.iter_mut() {
                            *sample = *value;
                        }
                    }
                },
                |err| error!("Stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::AudioUnavailable(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::AudioUnavailable(e.to_string()))?;

        let info = StreamInfo {
            sample_rate,
            channels: stream_config.channels,
            device_name,
        };
        Ok((stream, info))
    }
}

impl AudioBackend for CpalBackend {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn start(&mut self, graph: Graph) -> Result<StreamInfo, AudioError> {
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let backend = CpalBackend {
            output_device: self.output_device.clone(),
            sample_rate: self.sample_rate,
            buffer_size: self.buffer_size,
        };

        std::thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || match backend.build_stream(graph) {
                Ok((stream, info)) => {
                    let _ = ready_tx.send(Ok(info));
                    // Keep the stream alive for the rest of the process.
                    let _stream = stream;
                    loop {
                        std::thread::park();
                    }
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .map_err(|e| AudioError::AudioUnavailable(e.to_string()))?;

        ready_rx.recv().map_err(|_| {
            AudioError::AudioUnavailable("audio output thread exited during startup".into())
        })?
    }
}
