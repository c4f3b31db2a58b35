//! Integration tests for the entry store
//!
//! These tests cover ordering, deletion, validation, search, first-run
//! seeding and persistence across a simulated restart.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Duration, TimeZone, Utc};
use lifelog::entries::{DEMO_OWNER, EntryStore};
use lifelog::error::Error;
use lifelog::storage::{ENTRIES_KEY, KeyValueStore, MemoryStore, Persistence, Slot, Storage};
use lifelog::types::{AudioRef, Category, Entry, NewEntry};
use uuid::Uuid;

fn memory_slot() -> (Arc<MemoryStore>, Slot) {
    let backend = Arc::new(MemoryStore::new());
    let slot = Slot::new(backend.clone(), ENTRIES_KEY);
    (backend, slot)
}

fn empty_store() -> EntryStore {
    let (_, slot) = memory_slot();
    EntryStore::open_with_seeding(slot, false).unwrap()
}

fn new_entry(description: &str, categories: Vec<Category>) -> NewEntry {
    NewEntry::new(description, categories, "agent-7")
}

/// Slot whose writes can be made to fail on demand
struct FlakySlot {
    inner: Slot,
    failing: Arc<AtomicBool>,
}

impl Persistence for FlakySlot {
    fn load(&self) -> lifelog::Result<Option<Vec<u8>>> {
        self.inner.load()
    }

    fn save(&self, bytes: &[u8]) -> lifelog::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::other("disk full")));
        }
        self.inner.save(bytes)
    }

    fn clear(&self) -> lifelog::Result<()> {
        self.inner.clear()
    }
}

fn stored_entry(description: &str, created_at: chrono::DateTime<Utc>) -> Entry {
    Entry {
        id: Uuid::new_v4(),
        created_at,
        description: description.to_string(),
        categories: vec![Category::Social],
        audio_ref: None,
        owner_id: "agent-7".to_string(),
    }
}

// ============ Ordering ============

#[test]
fn test_list_is_newest_first() {
    let store = empty_store();

    let mut created = Vec::new();
    for i in 0..5 {
        let entry = store
            .create(new_entry(&format!("entry {i}"), vec![Category::Fitness]))
            .unwrap();
        created.push(entry.id);
    }

    let listed = store.list();
    assert_eq!(listed.len(), 5);
    assert_eq!(listed[0].id, created[4], "most recent entry must come first");

    for pair in listed.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }
}

#[test]
fn test_equal_timestamps_keep_stored_order() {
    let (_, slot) = memory_slot();
    let tied = Utc.with_ymd_and_hms(2026, 5, 4, 10, 30, 0).unwrap();
    let stored = vec![
        stored_entry("first", tied),
        stored_entry("second", tied),
        stored_entry("newest", tied + Duration::hours(1)),
    ];
    slot.save(&serde_json::to_vec(&stored).unwrap()).unwrap();

    let store = EntryStore::open(slot).unwrap();

    let listed: Vec<_> = store.list().into_iter().map(|e| e.description).collect();
    assert_eq!(listed, ["newest", "first", "second"]);

    let searched: Vec<_> = store.search("").into_iter().map(|e| e.description).collect();
    assert_eq!(searched, listed);
}

// ============ Deletion ============

#[test]
fn test_delete_then_lookup_is_absent() {
    let store = empty_store();
    let keep = store
        .create(new_entry("keeps a journal", vec![Category::Minimalist]))
        .unwrap();
    let gone = store
        .create(new_entry("travels monthly", vec![Category::Travel]))
        .unwrap();

    store.delete(&gone.id).unwrap();

    assert!(store.get_by_id(&gone.id).is_none());
    assert_eq!(store.get_by_id(&keep.id).unwrap(), keep);
    assert_eq!(store.len(), 1);
}

#[test]
fn test_delete_unknown_id_is_noop() {
    let (backend, slot) = memory_slot();
    let store = EntryStore::open_with_seeding(slot, false).unwrap();
    store
        .create(new_entry("cycles to work", vec![Category::Sustainable]))
        .unwrap();

    let before = store.list();
    let stored_before = backend.get(ENTRIES_KEY).unwrap();

    store.delete(&Uuid::new_v4()).unwrap();

    assert_eq!(store.list(), before);
    assert_eq!(backend.get(ENTRIES_KEY).unwrap(), stored_before);
}

// ============ Validation ============

#[test]
fn test_create_rejects_empty_description() {
    let (backend, slot) = memory_slot();
    let store = EntryStore::open_with_seeding(slot, false).unwrap();

    let err = store
        .create(new_entry("", vec![Category::Luxury]))
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert!(store.is_empty());
    assert!(!backend.contains(ENTRIES_KEY), "rejected create must not write");
}

#[test]
fn test_create_rejects_empty_categories() {
    let store = empty_store();
    store
        .create(new_entry("existing", vec![Category::Social]))
        .unwrap();
    let before = store.list();

    let err = store.create(new_entry("no tags", vec![])).unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(store.list(), before);
}

#[test]
fn test_create_keeps_audio_and_owner() {
    let store = empty_store();
    let audio = AudioRef {
        url: "blob:lifelog/1234".to_string(),
        file_name: "interview.m4a".to_string(),
    };

    let input =
        new_entry("Talked about ski trips", vec![Category::Travel]).with_audio(audio.clone());
    let entry = store.create(input).unwrap();

    assert_eq!(entry.audio_ref, Some(audio));
    assert_eq!(entry.owner_id, "agent-7");
    assert_eq!(store.get_by_id(&entry.id).unwrap(), entry);
}

// ============ Write failures ============

#[test]
fn test_failed_writes_leave_collection_unchanged() {
    let (backend, slot) = memory_slot();
    let failing = Arc::new(AtomicBool::new(false));
    let store = EntryStore::open_with_seeding(
        FlakySlot {
            inner: slot,
            failing: Arc::clone(&failing),
        },
        false,
    )
    .unwrap();
    let kept = store
        .create(new_entry("collects vinyl", vec![Category::Minimalist]))
        .unwrap();
    let stored_before = backend.get(ENTRIES_KEY).unwrap();
    let listed_before = store.list();

    failing.store(true, Ordering::SeqCst);

    let err = store
        .create(new_entry("never lands", vec![Category::Travel]))
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(store.delete(&kept.id).is_err());

    assert_eq!(store.len(), 1);
    assert_eq!(store.list(), listed_before);
    assert_eq!(store.get_by_id(&kept.id).unwrap(), kept);
    assert_eq!(backend.get(ENTRIES_KEY).unwrap(), stored_before);

    // writes resume once the backend recovers
    failing.store(false, Ordering::SeqCst);
    store.delete(&kept.id).unwrap();
    assert!(store.is_empty());
}

// ============ Search ============

#[test]
fn test_empty_search_matches_list() {
    let (_, slot) = memory_slot();
    let store = EntryStore::open(slot).unwrap();
    store
        .create(new_entry("one more", vec![Category::Wellness]))
        .unwrap();

    assert_eq!(store.search(""), store.list());
}

#[test]
fn test_search_is_case_insensitive_on_description_and_categories() {
    let store = empty_store();
    let spa = store
        .create(new_entry("Weekly SPA visits", vec![Category::Wellness]))
        .unwrap();
    let tech = store
        .create(new_entry("Smart home everything", vec![Category::TechForward]))
        .unwrap();
    store
        .create(new_entry("Golf on Sundays", vec![Category::Luxury]))
        .unwrap();

    let by_description = store.search("spa");
    assert_eq!(by_description.len(), 1);
    assert_eq!(by_description[0].id, spa.id);

    let by_category = store.search("tech-fOrWard");
    assert_eq!(by_category.len(), 1);
    assert_eq!(by_category[0].id, tech.id);

    assert!(store.search("yacht").is_empty());
}

#[test]
fn test_search_never_returns_non_matching_entries() {
    let (_, slot) = memory_slot();
    let store = EntryStore::open(slot).unwrap();

    for query in ["e", "LUX", "family", "remote", "zzz"] {
        let needle = query.to_lowercase();
        let results = store.search(query);
        for entry in &results {
            let matches = entry.description.to_lowercase().contains(&needle)
                || entry
                    .categories
                    .iter()
                    .any(|c| c.as_str().to_lowercase().contains(&needle));
            assert!(matches, "{query:?} returned non-matching entry {}", entry.id);
        }

        // results keep list() order
        let order: Vec<_> = store
            .list()
            .into_iter()
            .filter(|e| results.iter().any(|r| r.id == e.id))
            .map(|e| e.id)
            .collect();
        let result_ids: Vec<_> = results.iter().map(|e| e.id).collect();
        assert_eq!(order, result_ids);
    }
}

// ============ Seeding ============

#[test]
fn test_first_run_seeds_examples() {
    let (backend, slot) = memory_slot();
    let store = EntryStore::open(slot).unwrap();

    assert_eq!(store.len(), 12);
    assert!(store.list().iter().all(|e| e.owner_id == DEMO_OWNER));
    assert!(backend.contains(ENTRIES_KEY), "seed must be persisted");
}

#[test]
fn test_cleared_collection_is_not_reseeded() {
    let (backend, slot) = memory_slot();
    let store = EntryStore::open(slot.clone()).unwrap();
    for entry in store.list() {
        store.delete(&entry.id).unwrap();
    }
    assert!(store.is_empty());
    assert_eq!(backend.get(ENTRIES_KEY).unwrap().as_deref(), Some("[]"));
    drop(store);

    let reopened = EntryStore::open(slot).unwrap();
    assert!(reopened.is_empty());
}

#[test]
fn test_corrupt_collection_is_an_error() {
    let (_, slot) = memory_slot();
    slot.save(b"{not json").unwrap();

    let err = EntryStore::open(slot).err().unwrap();
    assert!(matches!(err, Error::Serialization(_)));
}

// ============ Persistence ============

#[test]
fn test_round_trip_through_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lifelog.db");

    let before = {
        let storage: Arc<dyn KeyValueStore> = Arc::new(Storage::open(&path).unwrap());
        let store =
            EntryStore::open_with_seeding(Slot::new(storage, ENTRIES_KEY), false).unwrap();
        store
            .create(new_entry("first", vec![Category::Fitness, Category::Social]))
            .unwrap();
        store
            .create(
                new_entry("second", vec![Category::CareerDriven]).with_audio(AudioRef {
                    url: "blob:lifelog/abc".to_string(),
                    file_name: "recording-1.wav".to_string(),
                }),
            )
            .unwrap();
        store
            .create(new_entry("third", vec![Category::FamilyFocused]))
            .unwrap();
        store.list()
    };

    let storage: Arc<dyn KeyValueStore> = Arc::new(Storage::open(&path).unwrap());
    let reopened = EntryStore::open(Slot::new(storage, ENTRIES_KEY)).unwrap();

    assert_eq!(reopened.list(), before);
}

#[test]
fn test_stored_layout_uses_entry_field_names() {
    let (backend, slot) = memory_slot();
    let store = EntryStore::open_with_seeding(slot, false).unwrap();
    store
        .create(new_entry("likes vinyl", vec![Category::Minimalist]))
        .unwrap();

    let raw = backend.get(ENTRIES_KEY).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let first = &value.as_array().unwrap()[0];

    for field in ["id", "createdAt", "description", "categories", "ownerId"] {
        assert!(first.get(field).is_some(), "missing field {field}");
    }
    assert_eq!(first["categories"][0], "Minimalist");
}
