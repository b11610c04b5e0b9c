//! Per-deck match persistence.
//!
//! Match records live under the key `matches:{deck_id}` as one JSON array,
//! newest first. Every write replaces the whole array.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::records::{MatchRecord, NewMatch};

/// String key/value storage the match store is built on.
pub trait KeyValueStore: Send + Sync {
    /// Returns `None` when the key has never been written.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Removing a missing key succeeds.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Storage key for a deck's match list.
pub fn matches_key(deck_id: &str) -> String {
    format!("matches:{}", deck_id)
}

fn validate_deck_id(deck_id: &str) -> Result<(), StoreError> {
    let valid = !deck_id.is_empty()
        && deck_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidDeckId(deck_id.to_string()))
    }
}

/// Match records grouped by deck over an injected [`KeyValueStore`].
///
/// Read-modify-write cycles hold an internal lock, so a `bulk_add` is never
/// interleaved with another write through the same instance.
pub struct MatchStore<S: KeyValueStore> {
    kv: S,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> MatchStore<S> {
    pub fn new(kv: S) -> Self {
        MatchStore {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &S {
        &self.kv
    }

    /// Lists a deck's matches, newest first.
    ///
    /// Missing, unreadable or corrupt data yields an empty list.
    pub fn list(&self, deck_id: &str) -> Vec<MatchRecord> {
        if let Err(e) = validate_deck_id(deck_id) {
            warn!("{}", e);
            return Vec::new();
        }

        match self.load(deck_id) {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to read {}: {}", matches_key(deck_id), e);
                Vec::new()
            }
        }
    }

    /// Reads a deck's stored list for a write.
    ///
    /// Backend read failures are returned so a writer never replaces history
    /// it could not see. Corrupt JSON reads as empty and is overwritten by the
    /// next write.
    fn load(&self, deck_id: &str) -> Result<Vec<MatchRecord>, StoreError> {
        let key = matches_key(deck_id);
        let Some(raw) = self.kv.get(&key)? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&raw) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!("Stored matches under {} are corrupt, ignoring: {}", key, e);
                Ok(Vec::new())
            }
        }
    }

    /// Adds matches to the front of a deck's list in the given order.
    ///
    /// Missing ids get a fresh UUID, as do ids already used in the deck.
    /// Missing dates are stamped with the current time. The full list is
    /// written once. Returns the number of matches added.
    pub fn bulk_add(&self, deck_id: &str, matches: Vec<NewMatch>) -> Result<usize, StoreError> {
        validate_deck_id(deck_id)?;
        if matches.is_empty() {
            return Ok(0);
        }

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let existing = self.load(deck_id)?;
        let mut used_ids: HashSet<String> = existing.iter().map(|r| r.id.clone()).collect();
        let now = Utc::now();

        let mut added: Vec<MatchRecord> = Vec::with_capacity(matches.len() + existing.len());
        for new in matches {
            let id = match new.id {
                Some(id) if !used_ids.contains(&id) => id,
                Some(id) => {
                    debug!("Match id {} already used in deck {}, assigning a new one", id, deck_id);
                    Uuid::new_v4().to_string()
                }
                None => Uuid::new_v4().to_string(),
            };
            used_ids.insert(id.clone());

            added.push(MatchRecord {
                id,
                deck_id: deck_id.to_string(),
                date: new.date.unwrap_or(now),
                round: new.round,
                opponent: new.opponent,
                opponent_inks: new.opponent_inks,
                result: new.result,
                notes: new.notes,
            });
        }

        let count = added.len();
        added.extend(existing);
        self.write(deck_id, &added)?;

        info!("Added {} matches to deck {}", count, deck_id);
        Ok(count)
    }

    /// Replaces a deck's stored list with `records`.
    pub fn persist(&self, deck_id: &str, records: &[MatchRecord]) -> Result<(), StoreError> {
        validate_deck_id(deck_id)?;
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write(deck_id, records)
    }

    /// Deletes one match by id. Returns whether it existed.
    pub fn delete_one(&self, deck_id: &str, id: &str) -> Result<bool, StoreError> {
        validate_deck_id(deck_id)?;
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut records = self.load(deck_id)?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Ok(false);
        }

        self.write(deck_id, &records)?;
        Ok(true)
    }

    /// Removes every match of a deck.
    pub fn clear(&self, deck_id: &str) -> Result<(), StoreError> {
        validate_deck_id(deck_id)?;
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.kv.remove(&matches_key(deck_id))?;
        info!("Cleared matches of deck {}", deck_id);
        Ok(())
    }

    /// Callers hold `write_lock`.
    fn write(&self, deck_id: &str, records: &[MatchRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_string(records)?;
        self.kv.set(&matches_key(deck_id), &json)
    }
}
