//! Winner history
//!
//! Last 10 announced winners, newest first, persisted alongside the roster.

use serde::{Deserialize, Serialize};

use crate::consts::MAX_HISTORY;
use crate::error::StorageError;
use crate::persistence::Store;
use crate::roster::Participant;

/// A single announced winner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinnerEntry {
    pub id: String,
    pub name: String,
    /// Unix timestamp (ms) of the announcement
    pub timestamp: f64,
}

/// Bounded winner log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WinnerHistory {
    pub entries: Vec<WinnerEntry>,
}

impl WinnerHistory {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "lucky_draw_history";

    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record a winner at the front, dropping the oldest past the limit
    pub fn record(&mut self, winner: &Participant, timestamp: f64) {
        self.entries.insert(
            0,
            WinnerEntry {
                id: winner.id.clone(),
                name: winner.name.clone(),
                timestamp,
            },
        );
        self.entries.truncate(MAX_HISTORY);
    }

    pub fn latest(&self) -> Option<&WinnerEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Load from `store`; unreadable data starts a fresh log
    pub fn load(store: &dyn Store) -> Self {
        match store.get(Self::STORAGE_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<Vec<WinnerEntry>>(&json) {
                Ok(mut entries) => {
                    entries.truncate(MAX_HISTORY);
                    log::info!("Loaded {} past winners", entries.len());
                    return Self { entries };
                }
                Err(e) => log::warn!("Discarding stored winner history: {}", e),
            },
            Ok(None) => {}
            Err(e) => log::warn!("Could not read winner history: {}", e),
        }

        log::info!("No winner history found, starting fresh");
        Self::new()
    }

    pub fn save(&self, store: &mut dyn Store) -> Result<(), StorageError> {
        let json = serde_json::to_string(&self.entries)?;
        store.set(Self::STORAGE_KEY, &json)?;
        log::info!("Winner history saved ({} entries)", self.entries.len());
        Ok(())
    }
}

/// Relative age of an entry ("Just now", "5 mins ago", ...)
pub fn format_age(timestamp: f64, now: f64) -> String {
    let diff_mins = (now - timestamp) / 60_000.0;
    let diff_hours = diff_mins / 60.0;
    let diff_days = diff_hours / 24.0;

    if diff_days >= 1.0 {
        let days = diff_days.floor() as i64;
        if days == 1 {
            "Yesterday".to_string()
        } else {
            format!("{} days ago", days)
        }
    } else if diff_hours >= 1.0 {
        let hours = diff_hours.floor() as i64;
        if hours == 1 {
            "1 hour ago".to_string()
        } else {
            format!("{} hours ago", hours)
        }
    } else if diff_mins >= 1.0 {
        let mins = diff_mins.floor() as i64;
        if mins == 1 {
            "1 min ago".to_string()
        } else {
            format!("{} mins ago", mins)
        }
    } else {
        "Just now".to_string()
    }
}
