//! Entry store: the authoritative, most-recent-first collection of entries
//!
//! Every mutation serializes the whole collection and hands it to the
//! store's [`Persistence`]. The in-memory copy is only replaced after the
//! write succeeded.

use chrono::{Duration, Utc};
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::Persistence;
use crate::types::{Category, Entry, EntryId, NewEntry};

/// Owner id given to seeded example entries
pub const DEMO_OWNER: &str = "demo-agent";

const SEED_COUNT: usize = 12;

const SEED_DESCRIPTIONS: [&str; 6] = [
    "Customer expressed strong interest in sustainable living practices. They've recently transitioned to a plant-based diet and are looking at electric vehicles. Active gym membership with focus on yoga and meditation classes.",
    "High-end luxury preferences noted. Travels first class internationally 4-5 times per year. Interested in exclusive experiences and premium brands. Golf club membership and wine collecting as hobbies.",
    "Tech-forward minimalist lifestyle. Works remotely, digital nomad tendencies. Prefers experiences over possessions. Regular user of productivity apps and smart home devices.",
    "Family-focused with emphasis on work-life balance. Weekend activities center around children's sports and outdoor activities. Values quality time and educational experiences.",
    "Wellness-oriented individual. Regular spa visits, organic food preferences, and mindfulness practices. Interested in holistic health approaches and preventive care.",
    "Career-driven professional with focus on personal development. Attends conferences, takes online courses, and networks actively. Values efficiency and premium services.",
];

/// Day offsets (into the past) for seeded entries, spread over 60 days
const SEED_DAY_OFFSETS: [i64; SEED_COUNT] = [1, 4, 8, 12, 17, 21, 26, 32, 38, 44, 51, 58];

/// Store owning the entry collection
pub struct EntryStore {
    persistence: Box<dyn Persistence>,
    entries: RwLock<Vec<Entry>>,
}

impl EntryStore {
    /// Load the collection, seeding example entries on first run
    pub fn open(persistence: impl Persistence + 'static) -> Result<Self> {
        Self::open_with_seeding(persistence, true)
    }

    /// Load the collection; seed only if `seed_examples` and nothing was ever stored
    ///
    /// A stored empty collection is kept empty.
    pub fn open_with_seeding(
        persistence: impl Persistence + 'static,
        seed_examples: bool,
    ) -> Result<Self> {
        let store = Self {
            persistence: Box::new(persistence),
            entries: RwLock::new(Vec::new()),
        };

        match store.persistence.load()? {
            Some(bytes) => {
                let loaded: Vec<Entry> = serde_json::from_slice(&bytes)?;
                info!("Loaded {} entries from storage", loaded.len());
                *store.entries.write() = loaded;
            }
            None if seed_examples => {
                let seeded = example_entries();
                store.persist(&seeded)?;
                info!("Seeded {} example entries", seeded.len());
                *store.entries.write() = seeded;
            }
            None => {
                debug!("No stored entries; starting empty");
            }
        }

        Ok(store)
    }

    /// Validate and prepend a new entry
    pub fn create(&self, new_entry: NewEntry) -> Result<Entry> {
        if new_entry.description.trim().is_empty() {
            warn!("Rejected entry without description");
            return Err(Error::Validation("Please add a description".to_string()));
        }
        if new_entry.categories.is_empty() {
            warn!("Rejected entry without categories");
            return Err(Error::Validation(
                "Please select at least one category".to_string(),
            ));
        }

        let mut categories: Vec<Category> = Vec::with_capacity(new_entry.categories.len());
        for category in new_entry.categories {
            if !categories.contains(&category) {
                categories.push(category);
            }
        }

        let entry = Entry {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            description: new_entry.description,
            categories,
            audio_ref: new_entry.audio_ref,
            owner_id: new_entry.owner_id,
        };

        let mut entries = self.entries.write();
        let mut updated = Vec::with_capacity(entries.len() + 1);
        updated.push(entry.clone());
        updated.extend(entries.iter().cloned());

        self.persist(&updated)?;
        *entries = updated;

        debug!("Created entry {}", entry.id);
        Ok(entry)
    }

    /// Remove an entry; unknown ids are ignored
    pub fn delete(&self, id: &EntryId) -> Result<()> {
        let mut entries = self.entries.write();
        if !entries.iter().any(|e| e.id == *id) {
            debug!("Delete of unknown entry {} ignored", id);
            return Ok(());
        }

        let updated: Vec<Entry> = entries.iter().filter(|e| e.id != *id).cloned().collect();
        self.persist(&updated)?;
        *entries = updated;

        debug!("Deleted entry {}", id);
        Ok(())
    }

    /// Entries ordered by creation time, newest first
    pub fn list(&self) -> Vec<Entry> {
        let mut entries = self.entries.read().clone();
        // stable: equal timestamps keep stored order
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries
    }

    pub fn get_by_id(&self, id: &EntryId) -> Option<Entry> {
        self.entries.read().iter().find(|e| e.id == *id).cloned()
    }

    /// Case-insensitive match on description or any category label
    pub fn search(&self, query: &str) -> Vec<Entry> {
        let entries = self.list();
        if query.is_empty() {
            return entries;
        }

        let needle = query.to_lowercase();
        entries.into_iter().filter(|e| e.matches(&needle)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn persist(&self, entries: &[Entry]) -> Result<()> {
        let bytes = serde_json::to_vec(entries)?;
        self.persistence.save(&bytes)
    }
}

/// Deterministic example entries for a first run, newest first
fn example_entries() -> Vec<Entry> {
    let now = Utc::now();
    let all = Category::all();

    (0..SEED_COUNT)
        .map(|i| {
            let count = i % 3 + 1;
            let categories = (0..count).map(|j| all[(i * 3 + j * 4) % all.len()]).collect();

            Entry {
                id: Uuid::new_v4(),
                created_at: now - Duration::days(SEED_DAY_OFFSETS[i]),
                description: SEED_DESCRIPTIONS[i % SEED_DESCRIPTIONS.len()].to_string(),
                categories,
                audio_ref: None,
                owner_id: DEMO_OWNER.to_string(),
            }
        })
        .collect()
}
