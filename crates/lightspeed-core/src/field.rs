//! Three-state field wrapper for PATCH request bodies.
//!
//! The API distinguishes "leave this field alone" (absent) from "clear
//! this field" (explicit null). [`Field`] makes that distinction a type
//! instead of a process-wide sentinel value. It only appears in outbound
//! edit payloads; cached entity state never exposes it.
//!
//! Use with serde as:
//!
//! ```text
//! #[serde(default, skip_serializing_if = "Field::is_absent")]
//! pub thumbnail: Field<String>,
//! ```

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// A value that can be absent, explicitly null, or present.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Field<T> {
    /// The field is not part of the payload; the server leaves it alone.
    #[default]
    Absent,
    /// The field is sent as JSON `null`; the server clears it.
    Null,
    /// The field is sent with this value.
    Value(T),
}

impl<T> Field<T> {
    /// Whether the field should be omitted from the payload.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Present value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Absent | Self::Null => None,
        }
    }
}

impl<T> From<T> for Field<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl<T> From<Option<T>> for Field<T> {
    /// `Some` becomes a value, `None` becomes an explicit null.
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Value(v),
            None => Self::Null,
        }
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // Absent fields are expected to be skipped at the struct
            // level; if one slips through it serializes as null.
            Self::Absent | Self::Null => serializer.serialize_none(),
            Self::Value(v) => v.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // A key that is present deserializes here; `null` maps to Null.
        // Missing keys rely on #[serde(default)] producing Absent.
        Ok(Option::<T>::deserialize(deserializer)?.into())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
