//! Entry composer: the in-progress "record entry" form

use std::time::Duration;

use tracing::{debug, info};

use crate::entries::EntryStore;
use crate::error::{Error, Result};
use crate::session::SessionManager;
use crate::types::{AudioRef, Category, Entry, NewEntry};

/// Form state for a new entry
#[derive(Debug, Clone, Default)]
pub struct Composer {
    description: String,
    selected: Vec<Category>,
    audio: Option<AudioRef>,
    saving: bool,
    save_delay: Duration,
}

impl Composer {
    pub fn new(save_delay: Duration) -> Self {
        Self {
            save_delay,
            ..Default::default()
        }
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Select or deselect a category; returns whether it is now selected
    pub fn toggle_category(&mut self, category: Category) -> bool {
        if let Some(pos) = self.selected.iter().position(|c| *c == category) {
            self.selected.remove(pos);
            false
        } else {
            self.selected.push(category);
            true
        }
    }

    /// Selected categories in the order they were picked
    pub fn selected(&self) -> &[Category] {
        &self.selected
    }

    pub fn is_selected(&self, category: Category) -> bool {
        self.selected.contains(&category)
    }

    pub fn set_audio(&mut self, audio: AudioRef) {
        self.audio = Some(audio);
    }

    pub fn clear_audio(&mut self) {
        self.audio = None;
    }

    pub fn audio(&self) -> Option<&AudioRef> {
        self.audio.as_ref()
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Whether the save action should be enabled
    pub fn can_save(&self) -> bool {
        !self.saving && !self.description.trim().is_empty()
    }

    /// Check the form without touching the store
    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(Error::Validation("Please add a description".to_string()));
        }
        if self.selected.is_empty() {
            return Err(Error::Validation(
                "Please select at least one category".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate, wait out the save delay, create the entry and reset the form
    ///
    /// Dropping the future before it completes leaves the form intact and
    /// saveable again.
    pub async fn save(&mut self, store: &EntryStore, session: &SessionManager) -> Result<Entry> {
        self.validate()?;

        let mut new_entry = NewEntry::new(
            self.description.clone(),
            self.selected.clone(),
            session.owner_id(),
        );
        new_entry.audio_ref = self.audio.clone();

        let delay = self.save_delay;
        let result = {
            let _saving = SavingFlag::raise(&mut self.saving);
            tokio::time::sleep(delay).await;
            store.create(new_entry)
        };
        let entry = result?;

        info!("Entry saved: {}", entry.id);
        self.reset();
        Ok(entry)
    }

    /// Empty the form
    pub fn reset(&mut self) {
        self.description.clear();
        self.selected.clear();
        self.audio = None;
        debug!("Composer reset");
    }
}

/// Holds `saving` up until dropped, however the save ends
struct SavingFlag<'a>(&'a mut bool);

impl<'a> SavingFlag<'a> {
    fn raise(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for SavingFlag<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ENTRIES_KEY, MemoryStore, Slot, USER_KEY};
    use std::sync::Arc;

    fn store_and_session() -> (EntryStore, SessionManager) {
        let backend = Arc::new(MemoryStore::new());
        let store =
            EntryStore::open_with_seeding(Slot::new(backend.clone(), ENTRIES_KEY), false).unwrap();
        let session = SessionManager::open(Slot::new(backend, USER_KEY), Duration::ZERO).unwrap();
        (store, session)
    }

    #[test]
    fn test_toggle_category() {
        let mut composer = Composer::new(Duration::ZERO);
        assert!(composer.toggle_category(Category::Travel));
        assert!(composer.toggle_category(Category::Luxury));
        assert!(!composer.toggle_category(Category::Travel));
        assert_eq!(composer.selected(), &[Category::Luxury]);
        assert!(composer.is_selected(Category::Luxury));
    }

    #[test]
    fn test_validation_messages() {
        let mut composer = Composer::new(Duration::ZERO);
        assert!(!composer.can_save());

        let err = composer.validate().unwrap_err();
        assert_eq!(err.to_string(), "Validation failed: Please add a description");

        composer.set_description("Weekly farmers market regular");
        assert!(composer.can_save());
        let err = composer.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: Please select at least one category"
        );

        composer.toggle_category(Category::Sustainable);
        assert!(composer.validate().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_save_leaves_form_saveable() {
        let (store, session) = store_and_session();
        let mut composer = Composer::new(Duration::from_millis(600));
        composer.set_description("Sunday long runs");
        composer.toggle_category(Category::Fitness);

        let outcome =
            tokio::time::timeout(Duration::from_millis(100), composer.save(&store, &session)).await;

        assert!(outcome.is_err(), "save should still be waiting");
        assert!(!composer.is_saving());
        assert!(composer.can_save());
        assert_eq!(composer.description(), "Sunday long runs");
        assert!(store.is_empty());

        let entry = composer.save(&store, &session).await.unwrap();
        assert_eq!(entry.description, "Sunday long runs");
        assert_eq!(store.len(), 1);
        assert!(!composer.is_saving());
        assert!(composer.description().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_validation_never_raises_saving() {
        let (store, session) = store_and_session();
        let mut composer = Composer::new(Duration::from_millis(600));
        composer.set_description("No tags yet");

        assert!(composer.save(&store, &session).await.is_err());
        assert!(!composer.is_saving());
        assert!(store.is_empty());
    }
}
