//! Application context owning every Lifelog component
//!
//! Built once at startup and passed to whatever drives the UI; nothing in the
//! crate reaches for global state.

use std::sync::Arc;

use chrono::{DateTime, TimeZone};
use tracing::info;

use crate::analytics::EntryStats;
use crate::audio::{
    AudioCapture, CaptureDevice, MicrophoneConfig, MicrophoneDevice, ResourceRegistry,
};
use crate::compose::Composer;
use crate::config::AppConfig;
use crate::entries::EntryStore;
use crate::error::Result;
use crate::session::SessionManager;
use crate::storage::{ENTRIES_KEY, KeyValueStore, Slot, Storage, USER_KEY};
use crate::types::{Entry, EntryId};

/// The assembled application
pub struct Lifelog<D: CaptureDevice = MicrophoneDevice> {
    config: AppConfig,
    entries: EntryStore,
    session: SessionManager,
    capture: AudioCapture<D>,
    composer: Composer,
}

impl Lifelog<MicrophoneDevice> {
    /// Open the on-disk database and the default microphone
    pub fn open(config: AppConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let storage = Storage::open(config.database_path())?;
        let device = MicrophoneDevice::with_config(MicrophoneConfig {
            sample_rate: config.sample_rate,
            ..Default::default()
        });
        Self::with_backend(config, Arc::new(storage), device)
    }
}

impl<D: CaptureDevice> Lifelog<D> {
    /// Assemble on top of an arbitrary backend and capture device
    pub fn with_backend(
        config: AppConfig,
        backend: Arc<dyn KeyValueStore>,
        device: D,
    ) -> Result<Self> {
        let entries = EntryStore::open_with_seeding(
            Slot::new(Arc::clone(&backend), ENTRIES_KEY),
            config.seed_examples,
        )?;
        let session = SessionManager::open(
            Slot::new(Arc::clone(&backend), USER_KEY),
            config.sign_in_delay(),
        )?;
        let capture = AudioCapture::new(device, ResourceRegistry::new());
        let composer = Composer::new(config.save_delay());

        info!("Lifelog ready with {} entries", entries.len());
        Ok(Self {
            config,
            entries,
            session,
            capture,
            composer,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn entries(&self) -> &EntryStore {
        &self.entries
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn capture(&self) -> &AudioCapture<D> {
        &self.capture
    }

    pub fn capture_mut(&mut self) -> &mut AudioCapture<D> {
        &mut self.capture
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    /// Save the composed entry with whatever audio is currently attached
    ///
    /// Captured audio takes precedence; otherwise audio already set on the
    /// composer is kept. On success the captured audio now belongs to the
    /// entry and the capture is back to `Idle`.
    pub async fn save_entry(&mut self) -> Result<Entry> {
        let captured = self.capture.audio_ref().cloned();
        if let Some(audio_ref) = &captured {
            self.composer.set_audio(audio_ref.clone());
        }

        let entry = self.composer.save(&self.entries, &self.session).await?;
        if captured.is_some() {
            self.capture.detach();
        }
        Ok(entry)
    }

    /// Delete an entry and release its audio resource if this process holds it
    pub fn delete_entry(&self, id: &EntryId) -> Result<()> {
        let audio = self.entries.get_by_id(id).and_then(|e| e.audio_ref);
        self.entries.delete(id)?;
        if let Some(audio_ref) = audio {
            self.capture.resources().release(&audio_ref.url);
        }
        Ok(())
    }

    /// Stats panel figures for the current collection
    pub fn stats<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> EntryStats {
        EntryStats::compute(&self.entries.list(), now)
    }
}
