//! Dispatch event names and their cache effects.
//!
//! The gateway delivers dispatch frames with a string event name; this
//! module maps those names onto [`EventKind`] and decides what each kind
//! does to the entity cache before handlers run.

use serde_json::Value;

use lightspeed_cache::{EntityKind, Hydration};

/// Kind of dispatch event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Session established; initial state follows.
    Ready,
    /// Session resumed; replayed events follow.
    Resumed,
    /// A user's profile changed.
    UserUpdate,
    /// A stream went live.
    StreamBegin,
    /// A stream's information changed.
    StreamUpdate,
    /// A stream went offline.
    StreamEnd,
    /// A category was created.
    CategoryCreate,
    /// A category's information changed.
    CategoryUpdate,
    /// A category was deleted.
    CategoryDelete,
    /// A chat message was sent.
    MessageCreate,
    /// A chat message was deleted.
    MessageDelete,
    /// A chat ban was issued.
    BanCreate,
    /// A chat ban was lifted.
    BanDelete,
    /// An event name this library does not know.
    Unknown,
}

impl EventKind {
    /// Map a wire event name to its kind.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "ready" => Self::Ready,
            "resumed" => Self::Resumed,
            "user_update" => Self::UserUpdate,
            "stream_begin" => Self::StreamBegin,
            "stream_update" => Self::StreamUpdate,
            "stream_end" => Self::StreamEnd,
            "category_create" => Self::CategoryCreate,
            "category_update" => Self::CategoryUpdate,
            "category_delete" => Self::CategoryDelete,
            "message_create" => Self::MessageCreate,
            "message_delete" => Self::MessageDelete,
            "ban_create" => Self::BanCreate,
            "ban_delete" => Self::BanDelete,
            _ => Self::Unknown,
        }
    }
}

/// What an event does to the cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheAction {
    /// Merge the event body into an entry.
    Upsert {
        /// Entity kind to merge into.
        kind: EntityKind,
        /// Entry identifier.
        id: String,
        /// Hydration level of the event body.
        hydration: Hydration,
    },
    /// Evict an entry.
    Invalidate {
        /// Entity kind to evict from.
        kind: EntityKind,
        /// Entry identifier.
        id: String,
    },
}

/// Decide the cache effect of one dispatch event, if any.
///
/// Create events carry the complete object and hydrate fully; update
/// events may be sparse and stay partial. Bans and session markers have
/// no cached entity.
#[must_use]
pub fn cache_action(kind: EventKind, data: &Value) -> Option<CacheAction> {
    let id = entity_id(data)?;
    let action = match kind {
        EventKind::UserUpdate => CacheAction::Upsert {
            kind: EntityKind::User,
            id,
            hydration: Hydration::Partial,
        },
        EventKind::StreamBegin | EventKind::StreamUpdate | EventKind::StreamEnd => {
            CacheAction::Upsert {
                kind: EntityKind::Stream,
                id,
                hydration: Hydration::Partial,
            }
        }
        EventKind::CategoryCreate => CacheAction::Upsert {
            kind: EntityKind::Category,
            id,
            hydration: Hydration::Full,
        },
        EventKind::CategoryUpdate => CacheAction::Upsert {
            kind: EntityKind::Category,
            id,
            hydration: Hydration::Partial,
        },
        EventKind::CategoryDelete => CacheAction::Invalidate {
            kind: EntityKind::Category,
            id,
        },
        EventKind::MessageCreate => CacheAction::Upsert {
            kind: EntityKind::Message,
            id,
            hydration: Hydration::Full,
        },
        EventKind::MessageDelete => CacheAction::Invalidate {
            kind: EntityKind::Message,
            id,
        },
        _ => return None,
    };
    Some(action)
}

/// Extract the entity identifier from an event body.
fn entity_id(data: &Value) -> Option<String> {
    data.get("_id")
        .or_else(|| data.get("id"))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_known_and_unknown_names() {
        assert_eq!(EventKind::parse("message_create"), EventKind::MessageCreate);
        assert_eq!(EventKind::parse("stream_begin"), EventKind::StreamBegin);
        assert_eq!(EventKind::parse("ready"), EventKind::Ready);
        assert_eq!(EventKind::parse("totally_new"), EventKind::Unknown);
    }

    #[test]
    fn update_events_upsert_partial() {
        let action = cache_action(EventKind::UserUpdate, &json!({ "_id": "u1", "bio": "x" }));
        assert_eq!(
            action,
            Some(CacheAction::Upsert {
                kind: EntityKind::User,
                id: "u1".into(),
                hydration: Hydration::Partial,
            }),
        );
    }

    #[test]
    fn create_events_hydrate_fully() {
        let action = cache_action(
            EventKind::MessageCreate,
            &json!({ "_id": "m1", "stream_id": "s1", "author_id": "u1", "content": "hi" }),
        );
        assert_matches::assert_matches!(
            action,
            Some(CacheAction::Upsert { kind: EntityKind::Message, hydration: Hydration::Full, .. })
        );
    }

    #[test]
    fn delete_events_invalidate() {
        let action = cache_action(EventKind::CategoryDelete, &json!({ "_id": "c1" }));
        assert_eq!(
            action,
            Some(CacheAction::Invalidate {
                kind: EntityKind::Category,
                id: "c1".into(),
            }),
        );
    }

    #[test]
    fn session_markers_and_bans_touch_nothing() {
        assert!(cache_action(EventKind::Ready, &json!({ "_id": "x" })).is_none());
        assert!(cache_action(EventKind::BanCreate, &json!({ "_id": "b1" })).is_none());
        assert!(cache_action(EventKind::Unknown, &json!({ "_id": "x" })).is_none());
    }

    #[test]
    fn missing_id_means_no_action() {
        assert!(cache_action(EventKind::UserUpdate, &json!({ "bio": "x" })).is_none());
    }
}
