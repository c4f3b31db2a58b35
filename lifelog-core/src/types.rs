//! Core types used throughout Lifelog

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Unique identifier for entries
pub type EntryId = Uuid;

/// Audio data as raw bytes
pub type AudioData = Vec<u8>;

/// Owner id recorded when no session is active
pub const UNKNOWN_OWNER: &str = "unknown";

/// Lifestyle trait a customer entry can be tagged with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Fitness,
    Minimalist,
    Luxury,
    Travel,
    Wellness,
    Sustainable,
    #[serde(rename = "Tech-Forward")]
    TechForward,
    Social,
    #[serde(rename = "Family-Focused")]
    FamilyFocused,
    #[serde(rename = "Career-Driven")]
    CareerDriven,
}

impl Category {
    /// Get all categories in vocabulary order
    pub fn all() -> &'static [Category] {
        &[
            Category::Fitness,
            Category::Minimalist,
            Category::Luxury,
            Category::Travel,
            Category::Wellness,
            Category::Sustainable,
            Category::TechForward,
            Category::Social,
            Category::FamilyFocused,
            Category::CareerDriven,
        ]
    }

    /// Display label, identical to the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fitness => "Fitness",
            Self::Minimalist => "Minimalist",
            Self::Luxury => "Luxury",
            Self::Travel => "Travel",
            Self::Wellness => "Wellness",
            Self::Sustainable => "Sustainable",
            Self::TechForward => "Tech-Forward",
            Self::Social => "Social",
            Self::FamilyFocused => "Family-Focused",
            Self::CareerDriven => "Career-Driven",
        }
    }

    /// Position in the vocabulary, used to break ranking ties
    pub fn rank(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("Unknown category: {s}")))
    }
}

/// Reference to a recorded or uploaded audio resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioRef {
    /// Opaque handle, resolvable through the resource registry that minted it
    pub url: String,
    pub file_name: String,
}

/// A single recorded lifestyle observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: EntryId,
    pub created_at: DateTime<Utc>,
    pub description: String,
    pub categories: Vec<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_ref: Option<AudioRef>,
    pub owner_id: String,
}

impl Entry {
    /// Whether any of the entry's text fields contain `needle`
    ///
    /// `needle` must already be lowercased.
    pub fn matches(&self, needle: &str) -> bool {
        self.description.to_lowercase().contains(needle)
            || self
                .categories
                .iter()
                .any(|c| c.as_str().to_lowercase().contains(needle))
    }

    pub fn has_audio(&self) -> bool {
        self.audio_ref.is_some()
    }
}

/// Input for creating an entry; id and timestamp are assigned by the store
#[derive(Debug, Clone, Default)]
pub struct NewEntry {
    pub description: String,
    pub categories: Vec<Category>,
    pub audio_ref: Option<AudioRef>,
    pub owner_id: String,
}

impl NewEntry {
    pub fn new(
        description: impl Into<String>,
        categories: Vec<Category>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            categories,
            audio_ref: None,
            owner_id: owner_id.into(),
        }
    }

    pub fn with_audio(mut self, audio_ref: AudioRef) -> Self {
        self.audio_ref = Some(audio_ref);
        self
    }
}

/// The active session's user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl User {
    pub fn new(name: String, email: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            avatar: None,
        }
    }
}
