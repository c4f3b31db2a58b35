//! In-process registry handing out opaque urls for audio payloads

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::AudioData;

const URL_PREFIX: &str = "blob:lifelog/";

/// Audio bytes plus their media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioResource {
    pub mime_type: String,
    pub data: AudioData,
}

/// Shared map from minted url to audio payload
///
/// Cloning yields another handle to the same registry.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    resources: Arc<Mutex<HashMap<String, AudioResource>>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a payload and return a fresh url for it
    pub fn register(&self, data: AudioData, mime_type: impl Into<String>) -> String {
        let url = format!("{URL_PREFIX}{}", Uuid::new_v4());
        let resource = AudioResource {
            mime_type: mime_type.into(),
            data,
        };
        debug!("Registered {} ({} bytes)", url, resource.data.len());
        self.resources.lock().insert(url.clone(), resource);
        url
    }

    pub fn get(&self, url: &str) -> Option<AudioResource> {
        self.resources.lock().get(url).cloned()
    }

    /// Drop a payload; returns whether the url was live
    pub fn release(&self, url: &str) -> bool {
        let released = self.resources.lock().remove(url).is_some();
        if released {
            debug!("Released {}", url);
        }
        released
    }

    pub fn len(&self) -> usize {
        self.resources.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_release() {
        let registry = ResourceRegistry::new();
        let url = registry.register(vec![1, 2, 3], "audio/wav");

        assert!(url.starts_with(URL_PREFIX));
        assert_eq!(registry.get(&url).unwrap().data, vec![1, 2, 3]);

        assert!(registry.release(&url));
        assert!(!registry.release(&url));
        assert!(registry.get(&url).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let registry = ResourceRegistry::new();
        let other = registry.clone();
        let url = registry.register(Vec::new(), "audio/webm");
        assert_eq!(other.len(), 1);
        assert!(other.release(&url));
        assert!(registry.is_empty());
    }
}
