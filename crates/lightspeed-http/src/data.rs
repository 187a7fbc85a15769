//! Outbound wire payloads.
//!
//! Request body structs for the mutating routes. Edit payloads use
//! [`Field`] so a caller can distinguish "leave unchanged" from "clear":
//! absent fields are omitted from the JSON, `Field::Null` serializes as
//! an explicit `null`.

use serde::{Deserialize, Serialize};

use lightspeed_core::Field;

/// Body for `PUT /streams/` — enable streaming on an account.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataCreateStream {
    /// Invite code provided by the Lightspeed team.
    pub invite: String,
}

/// Body for `PATCH /streams/@me` and the admin stream edit.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DataEditStream {
    /// Stream title.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub title: Field<String>,
    /// Stream description.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub description: Field<String>,
    /// Attachment ID used for the thumbnail; null clears it.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub thumbnail: Field<String>,
    /// Stream tags.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub tags: Field<Vec<String>>,
    /// Stream category ID.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub category: Field<String>,
    /// RTMP URL to relay the stream to.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub rtmp_relay: Field<String>,
    /// Whether this stream is prohibited from going live.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub suspended: Field<bool>,
}

/// Body for `PUT /users/@me` — create a user profile.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataCreateUser {
    /// Username.
    pub username: String,
}

/// A social link on a user profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    /// Display title.
    pub title: String,
    /// Target URL.
    pub link: String,
}

/// Body for `PATCH /users/@me` and the admin user edit.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DataEditUser {
    /// New username.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub username: Field<String>,
    /// Attachment ID used for the avatar; null clears it.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub avatar: Field<String>,
    /// Attachment ID used for the banner; null clears it.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub banner: Field<String>,
    /// Profile bio; null clears it.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub bio: Field<String>,
    /// Social links; null clears them.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub social_links: Field<Vec<SocialLink>>,
    /// Hide the user and stream from public discovery.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub hidden: Field<bool>,
    /// Restrict the user from chatting globally.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub chat_restricted: Field<bool>,
}

/// Body for `PUT /streams/{stream_id}/bans/{user_id}`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DataBanUser {
    /// When this ban expires (RFC 3339); absent means permanent.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub expires: Field<String>,
    /// Ban reason.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub reason: Field<String>,
}

/// Body for `POST /categories/create`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataCreateCategory {
    /// Category title.
    pub title: String,
    /// Attachment ID for the cover photo.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub cover: Field<String>,
    /// Category description.
    pub description: String,
}

/// Body for `PATCH /categories/{category_id}`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DataEditCategory {
    /// Category title.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub title: Field<String>,
    /// Attachment ID for the cover photo; null clears it.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub cover: Field<String>,
    /// Category description; null clears it.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub description: Field<String>,
}

/// Body for `POST /chat/{chat_id}/messages`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataSendMessage {
    /// Message content.
    pub content: String,
}

/// Body for `POST /admin/invites`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataCreateInvite {
    /// Invite code.
    pub code: String,
}

/// Content being reported.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReportedContent {
    /// A stream, identified by its path.
    Stream {
        /// Path to the stream.
        path: String,
    },
    /// A user, identified by ID.
    User {
        /// ID of the user.
        id: String,
    },
}

/// Body for `POST /reports/send`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataReportContent {
    /// Content to report.
    pub content: ReportedContent,
    /// Report description.
    pub reason: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn edit_stream_omits_absent_and_sends_null() {
        let payload = DataEditStream {
            title: Field::Value("late night".into()),
            thumbnail: Field::Null,
            ..DataEditStream::default()
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({ "title": "late night", "thumbnail": null }),
        );
    }

    #[test]
    fn reported_content_is_internally_tagged() {
        let report = DataReportContent {
            content: ReportedContent::User { id: "u1".into() },
            reason: "spam".into(),
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({ "content": { "type": "User", "id": "u1" }, "reason": "spam" }),
        );

        let report = DataReportContent {
            content: ReportedContent::Stream { path: "p".into() },
            reason: "spam".into(),
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap()["content"]["type"],
            "Stream",
        );
    }

    #[test]
    fn empty_edit_serializes_to_empty_object() {
        assert_eq!(
            serde_json::to_value(DataEditUser::default()).unwrap(),
            json!({}),
        );
    }
}
