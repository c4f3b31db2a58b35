//! Derived statistics over the entry collection
//!
//! Everything here is a pure function of a slice of entries (usually the
//! output of `EntryStore::list`) and, where calendar months matter, an
//! explicit `now`.

use chrono::{DateTime, Datelike, TimeZone};

use crate::types::{Category, Entry};

/// Number of entries tagged with a category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: Category,
    pub count: usize,
}

/// Entry volume for the current and the preceding calendar month
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyVolume {
    pub current: usize,
    pub previous: usize,
    pub growth_percent: f64,
}

/// Per-category counts across the full collection, in vocabulary order
pub fn category_frequency(entries: &[Entry]) -> Vec<CategoryCount> {
    let mut counts = [0usize; 10];
    for entry in entries {
        for category in &entry.categories {
            counts[category.rank()] += 1;
        }
    }

    Category::all()
        .iter()
        .map(|&category| CategoryCount {
            category,
            count: counts[category.rank()],
        })
        .collect()
}

/// The `n` most frequent categories
///
/// Sorted by count descending, ties broken by vocabulary order. Categories no
/// entry uses are left out.
pub fn top_categories(entries: &[Entry], n: usize) -> Vec<CategoryCount> {
    let mut ranked: Vec<CategoryCount> = category_frequency(entries)
        .into_iter()
        .filter(|c| c.count > 0)
        .collect();
    // stable sort keeps vocabulary order among equal counts
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(n);
    ranked
}

/// Month-over-month growth, in percent
pub fn growth_percent(current: usize, previous: usize) -> f64 {
    if previous == 0 {
        return if current > 0 { 100.0 } else { 0.0 };
    }
    (current as f64 - previous as f64) / previous as f64 * 100.0
}

/// Count entries in `now`'s calendar month and the month before it
///
/// Entry timestamps are converted into `now`'s time zone before bucketing.
pub fn monthly_volume<Tz: TimeZone>(entries: &[Entry], now: &DateTime<Tz>) -> MonthlyVolume {
    let current_month = (now.year(), now.month());
    let previous_month = if now.month() == 1 {
        (now.year() - 1, 12)
    } else {
        (now.year(), now.month() - 1)
    };

    let mut current = 0;
    let mut previous = 0;
    for entry in entries {
        let local = entry.created_at.with_timezone(&now.timezone());
        let month = (local.year(), local.month());
        if month == current_month {
            current += 1;
        } else if month == previous_month {
            previous += 1;
        }
    }

    MonthlyVolume {
        current,
        previous,
        growth_percent: growth_percent(current, previous),
    }
}

/// Mean number of category tags per entry, 0 for an empty collection
pub fn average_categories_per_entry(entries: &[Entry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    let total: usize = entries.iter().map(|e| e.categories.len()).sum();
    total as f64 / entries.len() as f64
}

/// Stats panel summary
#[derive(Debug, Clone, PartialEq)]
pub struct EntryStats {
    pub total_entries: usize,
    pub entries_with_audio: usize,
    pub monthly: MonthlyVolume,
    pub average_categories: f64,
    pub top_categories: Vec<CategoryCount>,
}

impl EntryStats {
    /// Most categories shown in the panel's leaderboard
    ///
    /// Fewer are shown when fewer distinct categories are in use, none for an
    /// empty collection.
    pub const TOP_N: usize = 3;

    pub fn compute<Tz: TimeZone>(entries: &[Entry], now: &DateTime<Tz>) -> Self {
        Self {
            total_entries: entries.len(),
            entries_with_audio: entries.iter().filter(|e| e.has_audio()).count(),
            monthly: monthly_volume(entries, now),
            average_categories: average_categories_per_entry(entries),
            top_categories: top_categories(entries, Self::TOP_N),
        }
    }
}
