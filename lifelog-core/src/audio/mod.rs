//! Audio capture lifecycle for the entry being composed
//!
//! `Idle` → `Recording` → `Captured`, or `Idle` → `Captured` straight from a
//! file. Exactly one resource is held while `Captured`; `clear` releases it.

mod device;
mod resources;

pub use device::{CaptureDevice, CaptureStream, MicrophoneConfig, MicrophoneDevice};
pub use resources::{AudioResource, ResourceRegistry};

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::{AudioData, AudioRef};

/// State of the capture state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Captured(AudioRef),
}

/// A user-selected audio file
#[derive(Debug, Clone)]
pub struct AudioFile {
    pub name: String,
    pub mime_type: String,
    pub data: AudioData,
}

impl AudioFile {
    pub fn new(name: impl Into<String>, data: AudioData) -> Self {
        let name = name.into();
        let mime_type = mime_type_for(&name).to_string();
        Self {
            name,
            mime_type,
            data,
        }
    }

    /// Read a file from disk, keeping its file name
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Audio(format!("Not a file: {}", path.display())))?;
        let data = std::fs::read(path)?;
        Ok(Self::new(name, data))
    }
}

/// Drives microphone recording or file attachment for one composition
pub struct AudioCapture<D: CaptureDevice> {
    device: D,
    resources: ResourceRegistry,
    state: CaptureState,
    stream: Option<Box<dyn CaptureStream>>,
    elapsed_secs: Arc<AtomicU64>,
    ticker: Option<JoinHandle<()>>,
    playing: bool,
}

impl<D: CaptureDevice> AudioCapture<D> {
    pub fn new(device: D, resources: ResourceRegistry) -> Self {
        Self {
            device,
            resources,
            state: CaptureState::Idle,
            stream: None,
            elapsed_secs: Arc::new(AtomicU64::new(0)),
            ticker: None,
            playing: false,
        }
    }

    /// Ask the device for access and begin recording
    ///
    /// On failure the state stays `Idle`; there is no automatic retry.
    pub async fn start_recording(&mut self) -> Result<()> {
        if self.state != CaptureState::Idle {
            return Err(self.invalid("start recording"));
        }

        let stream = match self.device.open().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Microphone unavailable: {}", e);
                return Err(e);
            }
        };

        self.stream = Some(stream);
        self.state = CaptureState::Recording;
        self.start_ticker();

        info!("Audio recording started");
        Ok(())
    }

    /// Finish recording and attach the result as a single WAV resource
    pub fn stop_recording(&mut self) -> Result<AudioRef> {
        if self.state != CaptureState::Recording {
            return Err(self.invalid("stop recording"));
        }

        self.stop_ticker();

        let mut stream = self
            .stream
            .take()
            .ok_or_else(|| Error::Audio("Recording without an open stream".to_string()))?;
        let chunks = stream.take_chunks();
        let sample_rate = stream.sample_rate();
        stream.close();

        let pcm: AudioData = chunks.concat();
        let wav = match encode_wav(&pcm, sample_rate) {
            Ok(wav) => wav,
            Err(e) => {
                self.state = CaptureState::Idle;
                return Err(e);
            }
        };

        let url = self.resources.register(wav, "audio/wav");
        let audio_ref = AudioRef {
            url,
            file_name: format!("recording-{}.wav", Utc::now().timestamp_millis()),
        };

        info!(
            "Audio recording stopped after {}s, {} PCM bytes captured",
            self.elapsed_secs(),
            pcm.len()
        );
        self.state = CaptureState::Captured(audio_ref.clone());
        Ok(audio_ref)
    }

    /// Attach a selected file as-is, bypassing the microphone
    pub fn attach_file(&mut self, file: AudioFile) -> Result<AudioRef> {
        if self.state != CaptureState::Idle {
            return Err(self.invalid("attach a file"));
        }

        let url = self.resources.register(file.data, file.mime_type);
        let audio_ref = AudioRef {
            url,
            file_name: file.name,
        };

        debug!("Attached audio file {}", audio_ref.file_name);
        self.state = CaptureState::Captured(audio_ref.clone());
        Ok(audio_ref)
    }

    /// Read a file from disk and attach it
    pub fn attach_path(&mut self, path: impl AsRef<Path>) -> Result<AudioRef> {
        if self.state != CaptureState::Idle {
            return Err(self.invalid("attach a file"));
        }
        let file = AudioFile::read(path)?;
        self.attach_file(file)
    }

    /// Release the attached resource and return to `Idle`
    pub fn clear(&mut self) -> Result<()> {
        match &self.state {
            CaptureState::Idle => Ok(()),
            CaptureState::Recording => Err(self.invalid("clear")),
            CaptureState::Captured(audio_ref) => {
                self.resources.release(&audio_ref.url);
                debug!("Cleared audio {}", audio_ref.file_name);
                self.state = CaptureState::Idle;
                self.playing = false;
                self.elapsed_secs.store(0, Ordering::Relaxed);
                Ok(())
            }
        }
    }

    /// Hand the attached resource over to its new owner and return to `Idle`
    ///
    /// Unlike `clear`, the resource stays registered; used once a saved entry
    /// references it.
    pub fn detach(&mut self) -> Option<AudioRef> {
        if !matches!(self.state, CaptureState::Captured(_)) {
            return None;
        }
        self.playing = false;
        self.elapsed_secs.store(0, Ordering::Relaxed);
        match std::mem::replace(&mut self.state, CaptureState::Idle) {
            CaptureState::Captured(audio_ref) => Some(audio_ref),
            _ => None,
        }
    }

    /// Flip the playback flag; returns the new value
    pub fn toggle_playback(&mut self) -> Result<bool> {
        if !matches!(self.state, CaptureState::Captured(_)) {
            return Err(self.invalid("toggle playback"));
        }
        self.playing = !self.playing;
        Ok(self.playing)
    }

    /// Called when the player reaches the end of the resource
    pub fn playback_finished(&mut self) {
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == CaptureState::Recording
    }

    /// The attached resource, if any
    pub fn audio_ref(&self) -> Option<&AudioRef> {
        match &self.state {
            CaptureState::Captured(audio_ref) => Some(audio_ref),
            _ => None,
        }
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    /// Whole seconds since recording started
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs.load(Ordering::Relaxed)
    }

    /// Elapsed recording time as `m:ss`
    pub fn format_elapsed(&self) -> String {
        format_duration(self.elapsed_secs())
    }

    fn start_ticker(&mut self) {
        self.stop_ticker();
        self.elapsed_secs.store(0, Ordering::Relaxed);

        let elapsed = Arc::clone(&self.elapsed_secs);
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                elapsed.fetch_add(1, Ordering::Relaxed);
            }
        }));
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    fn invalid(&self, action: &str) -> Error {
        let state = match self.state {
            CaptureState::Idle => "idle",
            CaptureState::Recording => "recording",
            CaptureState::Captured(_) => "captured",
        };
        Error::InvalidState(format!("cannot {action} while {state}"))
    }
}

impl<D: CaptureDevice> Drop for AudioCapture<D> {
    fn drop(&mut self) {
        self.stop_ticker();
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }
    }
}

/// Format whole seconds as `m:ss`
pub fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Wrap mono 16-bit little-endian PCM in a WAV container
fn encode_wav(pcm: &[u8], sample_rate: u32) -> Result<AudioData> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buffer = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut buffer), spec)
            .map_err(|e| Error::Audio(format!("Failed to create WAV writer: {e}")))?;
        for frame in pcm.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([frame[0], frame[1]]))
                .map_err(|e| Error::Audio(format!("Failed to write sample: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| Error::Audio(format!("Failed to finalize WAV: {e}")))?;
    }
    Ok(buffer)
}

fn mime_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "ogg" | "oga" => "audio/ogg",
        "webm" => "audio/webm",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}
