//! Branded ID newtypes for type safety.
//!
//! Every entity in the Lightspeed API has a distinct ID type implemented
//! as a newtype wrapper around `String`. This prevents accidentally
//! passing a stream ID where a user ID is expected.
//!
//! IDs are issued by the server (ULID-style strings), so there is no
//! local generation — IDs only enter the program by parsing API payloads.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Unique identifier for a user account.
    UserId
}

branded_id! {
    /// Unique identifier for a stream.
    StreamId
}

branded_id! {
    /// Unique identifier for a stream category.
    CategoryId
}

branded_id! {
    /// Unique identifier for a chat message.
    MessageId
}

branded_id! {
    /// Unique identifier for a stream chat.
    ChatId
}

branded_id! {
    /// Unique identifier for a streaming region.
    RegionId
}

branded_id! {
    /// Identifier for one gateway session, issued on `Ready`.
    SessionId
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_roundtrips_through_string() {
        let id = UserId::from("01H5ZQW9XK");
        assert_eq!(id.as_str(), "01H5ZQW9XK");
        assert_eq!(String::from(id.clone()), "01H5ZQW9XK");
        assert_eq!(id.to_string(), "01H5ZQW9XK");
    }

    #[test]
    fn id_serde_transparent() {
        let id = StreamId::from("abc123");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc123\"");
        let back: StreamId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn distinct_id_types_do_not_compare() {
        // Compile-time property: UserId and StreamId are different types.
        fn takes_user(_: &UserId) {}
        let id = UserId::from("u1");
        takes_user(&id);
    }
}
