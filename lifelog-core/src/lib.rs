//! Lifelog Core - lifestyle entry capture and review
//!
//! Keeps a locally persisted collection of lifestyle entries (description,
//! category tags, optional audio) and drives the audio capture lifecycle used
//! while composing a new entry.

pub mod analytics;
pub mod app;
pub mod audio;
pub mod compose;
pub mod config;
pub mod entries;
pub mod error;
pub mod logging;
pub mod migrations;
pub mod session;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Re-export the main components for convenience
pub use analytics::{CategoryCount, EntryStats, MonthlyVolume};
pub use app::Lifelog;
pub use audio::{AudioCapture, CaptureDevice, CaptureState, MicrophoneDevice, ResourceRegistry};
pub use compose::Composer;
pub use config::AppConfig;
pub use entries::EntryStore;
pub use session::SessionManager;
pub use storage::{KeyValueStore, MemoryStore, Persistence, Slot, Storage};
