//! Capture device capability and the CPAL microphone implementation

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::AudioData;
use crate::error::{Error, Result};

/// An open capture stream accumulating 16-bit mono PCM chunks
pub trait CaptureStream {
    /// Sample rate of the PCM produced by `take_chunks`
    fn sample_rate(&self) -> u32;

    /// Drain the chunks captured so far
    fn take_chunks(&mut self) -> Vec<AudioData>;

    /// Release the underlying device; further chunks are discarded
    fn close(&mut self);
}

/// Something that can be asked for microphone access
#[async_trait(?Send)]
pub trait CaptureDevice {
    /// Request access and open a stream
    ///
    /// Fails with [`Error::DeviceAccess`] when permission is denied or no
    /// input device exists.
    async fn open(&self) -> Result<Box<dyn CaptureStream>>;
}

/// Microphone device configuration
#[derive(Debug, Clone)]
pub struct MicrophoneConfig {
    /// Preferred sample rate in Hz
    pub sample_rate: u32,
    /// Preferred number of input channels; captured audio is always mono
    pub channels: u16,
}

impl Default for MicrophoneConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
        }
    }
}

/// The host's default input device
#[derive(Debug, Clone, Default)]
pub struct MicrophoneDevice {
    config: MicrophoneConfig,
}

impl MicrophoneDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MicrophoneConfig) -> Self {
        Self { config }
    }
}

#[async_trait(?Send)]
impl CaptureDevice for MicrophoneDevice {
    async fn open(&self) -> Result<Box<dyn CaptureStream>> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::DeviceAccess("No input device available".to_string()))?;

        // note: device.name() is deprecated in cpal 0.17+, but works
        #[allow(deprecated)]
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using input device: {}", device_name);

        let supported_configs: Vec<_> = device
            .supported_input_configs()
            .map_err(|e| Error::DeviceAccess(format!("Failed to query input device: {e}")))?
            .collect();

        let InputSelection {
            config: supported_config,
            channels: input_channels,
            format: sample_format,
            sample_rate,
        } = select_input_config(
            &supported_configs,
            self.config.sample_rate,
            self.config.channels,
        )
        .ok_or_else(|| Error::DeviceAccess("No supported input config found".to_string()))?;

        let stream_config = supported_config.config();
        debug!(
            "Stream config: {:?} (input channels: {}, format: {:?})",
            stream_config, input_channels, sample_format
        );

        let chunks = Arc::new(Mutex::new(Vec::new()));
        let stream = build_input_stream(
            &device,
            &stream_config,
            sample_format,
            input_channels,
            Arc::clone(&chunks),
        )?;

        stream
            .play()
            .map_err(|e| Error::DeviceAccess(format!("Failed to start stream: {e}")))?;

        Ok(Box::new(MicrophoneStream {
            stream: Some(stream),
            chunks,
            sample_rate,
        }))
    }
}

struct MicrophoneStream {
    stream: Option<Stream>,
    chunks: Arc<Mutex<Vec<AudioData>>>,
    sample_rate: u32,
}

impl CaptureStream for MicrophoneStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn take_chunks(&mut self) -> Vec<AudioData> {
        std::mem::take(&mut *self.chunks.lock())
    }

    fn close(&mut self) {
        // dropping the stream releases the device
        if self.stream.take().is_some() {
            info!("Microphone released");
        }
    }
}

impl Drop for MicrophoneStream {
    fn drop(&mut self) {
        self.close();
    }
}

fn build_input_stream(
    device: &Device,
    stream_config: &StreamConfig,
    sample_format: SampleFormat,
    input_channels: u16,
    chunks: Arc<Mutex<Vec<AudioData>>>,
) -> Result<Stream> {
    match sample_format {
        SampleFormat::F32 => build_stream::<f32>(device, stream_config, input_channels, chunks),
        SampleFormat::I16 => build_stream::<i16>(device, stream_config, input_channels, chunks),
        SampleFormat::U16 => build_stream::<u16>(device, stream_config, input_channels, chunks),
        SampleFormat::I32 => build_stream::<i32>(device, stream_config, input_channels, chunks),
        SampleFormat::U32 => build_stream::<u32>(device, stream_config, input_channels, chunks),
        SampleFormat::I8 => build_stream::<i8>(device, stream_config, input_channels, chunks),
        SampleFormat::U8 => build_stream::<u8>(device, stream_config, input_channels, chunks),
        SampleFormat::F64 => build_stream::<f64>(device, stream_config, input_channels, chunks),
        other => Err(Error::DeviceAccess(format!(
            "Unsupported sample format: {other:?}"
        ))),
    }
}

fn build_stream<T>(
    device: &Device,
    stream_config: &StreamConfig,
    input_channels: u16,
    chunks: Arc<Mutex<Vec<AudioData>>>,
) -> Result<Stream>
where
    T: Sample + SizedSample,
    f32: cpal::FromSample<T>,
{
    let channels = input_channels.max(1) as usize;
    let err_fn = |err| error!("Audio stream error: {}", err);

    device
        .build_input_stream(
            stream_config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let chunk: AudioData = data
                    .chunks_exact(channels)
                    .flat_map(|frame| {
                        let sum: f32 = frame.iter().map(|s| s.to_sample::<f32>()).sum();
                        pcm16(sum / channels as f32)
                    })
                    .collect();
                if !chunk.is_empty() {
                    chunks.lock().push(chunk);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| Error::DeviceAccess(format!("Failed to open input stream: {e}")))
}

/// Convert one f32 sample to little-endian 16-bit PCM
fn pcm16(sample: f32) -> [u8; 2] {
    let clamped = sample.clamp(-1.0, 1.0);
    ((clamped * 32767.0) as i16).to_le_bytes()
}

/// Sample formats `build_input_stream` can convert, best first
const SUPPORTED_FORMATS: [SampleFormat; 8] = [
    SampleFormat::F32,
    SampleFormat::I16,
    SampleFormat::U16,
    SampleFormat::I32,
    SampleFormat::U32,
    SampleFormat::F64,
    SampleFormat::I8,
    SampleFormat::U8,
];

/// Input configuration picked for a device
#[derive(Debug, Clone)]
struct InputSelection {
    config: cpal::SupportedStreamConfig,
    channels: u16,
    format: SampleFormat,
    sample_rate: u32,
}

/// Pick the range closest to the preferred layout
///
/// Matching channel count wins over sample rate distance, which wins over
/// format preference. Ranges in formats we cannot convert are ignored.
fn select_input_config(
    ranges: &[cpal::SupportedStreamConfigRange],
    preferred_rate: u32,
    preferred_channels: u16,
) -> Option<InputSelection> {
    let best = ranges
        .iter()
        .copied()
        .filter_map(|range| format_rank(range.sample_format()).map(|rank| (range, rank)))
        .min_by_key(|(range, rank)| {
            (
                range.channels() != preferred_channels,
                rate_distance(range, preferred_rate),
                *rank,
            )
        })
        .map(|(range, _)| range)?;

    let sample_rate = preferred_rate.clamp(best.min_sample_rate(), best.max_sample_rate());
    Some(InputSelection {
        config: best.with_sample_rate(sample_rate),
        channels: best.channels(),
        format: best.sample_format(),
        sample_rate,
    })
}

fn format_rank(format: SampleFormat) -> Option<usize> {
    SUPPORTED_FORMATS.iter().position(|f| *f == format)
}

fn rate_distance(range: &cpal::SupportedStreamConfigRange, rate: u32) -> u32 {
    let clamped = rate.clamp(range.min_sample_rate(), range.max_sample_rate());
    clamped.abs_diff(rate)
}
