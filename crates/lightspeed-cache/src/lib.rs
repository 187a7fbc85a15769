//! # lightspeed-cache
//!
//! Read-through, mutation-through entity cache.
//!
//! The cache is the single owner of entity state: the REST dispatcher
//! and the gateway session only produce update payloads that are merged
//! in here. Entries track a hydration level — a sparse payload from a
//! gateway event never downgrades an entry that was fully fetched over
//! REST; it only overwrites the fields it actually carries.
//!
//! Entries are evicted solely by explicit invalidation (the server
//! reporting a deletion) or by [`EntityCache::clear`] after a failed
//! session resume. There is no TTL expiry.

#![deny(unsafe_code)]

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of entity stored in the cache.
///
/// Identifiers are only unique within a kind, so the cache key is the
/// pair of kind and ID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A user account.
    User,
    /// A stream.
    Stream,
    /// A stream category.
    Category,
    /// A chat message.
    Message,
    /// A streaming region.
    Region,
}

/// How complete a cached representation is.
///
/// Ordered: `Partial < Full`. An entry's level only ever increases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hydration {
    /// Sparse representation, e.g. from a gateway event that carries
    /// only the changed fields.
    Partial,
    /// Fully fetched representation.
    Full,
}

/// One cached entity.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    /// Entity kind.
    pub kind: EntityKind,
    /// Server-issued identifier.
    pub id: String,
    /// Hydration level; moves partial → full, never back.
    pub hydration: Hydration,
    /// Merged JSON object holding the latest known field values.
    pub data: Value,
    /// When this entry last absorbed a payload.
    pub updated_at: DateTime<Utc>,
}

/// Concurrent entity cache keyed by `(kind, id)`.
///
/// Backed by a sharded map, so updates to different entries never block
/// each other and updates to the same entry serialize on its shard lock.
#[derive(Debug, Default)]
pub struct EntityCache {
    entries: DashMap<(EntityKind, String), CacheEntry>,
}

impl EntityCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the entry for `id`, if one exists.
    #[must_use]
    pub fn get(&self, kind: EntityKind, id: &str) -> Option<CacheEntry> {
        self.entries.get(&(kind, id.to_owned())).map(|e| e.clone())
    }

    /// Merge `payload` into the entry for `id`, creating it on first
    /// sighting. Returns a snapshot of the merged entry.
    ///
    /// Merge rule: keys present in `payload` overwrite the stored value
    /// (including explicit `null`); keys absent from `payload` are left
    /// unchanged; the hydration level becomes the maximum of the stored
    /// and incoming levels. Re-applying an identical payload is a no-op,
    /// and non-overlapping payloads commute.
    ///
    /// Non-object payloads replace the stored data wholesale; the API
    /// only ships objects for entities, so this is a defensive path.
    pub fn upsert(
        &self,
        kind: EntityKind,
        id: &str,
        payload: &Value,
        hydration: Hydration,
    ) -> CacheEntry {
        let mut entry = self
            .entries
            .entry((kind, id.to_owned()))
            .or_insert_with(|| CacheEntry {
                kind,
                id: id.to_owned(),
                hydration,
                data: Value::Object(serde_json::Map::new()),
                updated_at: Utc::now(),
            });

        merge_fields(&mut entry.data, payload);
        entry.hydration = entry.hydration.max(hydration);
        entry.updated_at = Utc::now();
        entry.clone()
    }

    /// Drop the entry for `id`. Returns the evicted entry, if any.
    pub fn invalidate(&self, kind: EntityKind, id: &str) -> Option<CacheEntry> {
        let removed = self.entries.remove(&(kind, id.to_owned())).map(|(_, e)| e);
        if removed.is_some() {
            tracing::debug!(?kind, id, "cache entry invalidated");
        }
        removed
    }

    /// Drop every entry. Used when a failed resume leaves the cache
    /// potentially missing events.
    pub fn clear(&self) {
        let evicted = self.entries.len();
        self.entries.clear();
        tracing::debug!(evicted, "cache cleared for resynchronization");
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Merge `incoming` into `stored` field by field.
fn merge_fields(stored: &mut Value, incoming: &Value) {
    match (stored, incoming) {
        (Value::Object(stored), Value::Object(incoming)) => {
            for (key, value) in incoming {
                let _ = stored.insert(key.clone(), value.clone());
            }
        }
        (stored, incoming) => *stored = incoming.clone(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
