//! Typed API entities.
//!
//! One struct per wire object, deserialized from the raw JSON the REST
//! surface and gateway dispatches carry. The server names internal IDs
//! `_id`; every other field keeps its wire name. Optional fields mirror
//! what the server may omit — sparse gateway payloads deserialize into
//! the same types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lightspeed_core::ids::{CategoryId, MessageId, RegionId, StreamId, UserId};

pub use lightspeed_http::data::SocialLink;

/// A streaming region.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Region {
    /// Internal ID.
    #[serde(rename = "_id")]
    pub id: RegionId,
    /// Publicly accessible server hostname.
    pub hostname: String,
    /// URL to connect to this server's signaling service.
    pub signaling: String,
    /// URL to connect to this server's ingest service.
    pub ingest: String,
    /// The location of this server.
    pub location: String,
    /// Last ping from this server. A server silent for more than 30
    /// seconds should be assumed offline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_ping: Option<DateTime<Utc>>,
}

/// How clients should connect to a live stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Controller {
    /// Lightspeed's own media pipeline.
    Inhouse,
    /// MistServer-backed delivery.
    Mist,
}

/// Additional information present while a stream is live.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Live {
    /// When this stream started.
    pub started_at: DateTime<Utc>,
    /// Region clients should connect to in order to watch.
    pub region: RegionId,
    /// How clients should connect to this live stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<Controller>,
}

/// Any user live stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Stream {
    /// Internal ID.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<StreamId>,
    /// ID used for the FTL protocol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ftl_id: Option<i64>,
    /// Stream title.
    pub title: String,
    /// Stream description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// ID of the thumbnail file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Stream tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Stream token for FTL. Only present on own stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Present while the stream is live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live: Option<Live>,
    /// Category ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryId>,
    /// IDs of moderators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderators: Option<Vec<UserId>>,
    /// Whether VODs are recorded for this stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<bool>,
    /// Whether this stream is currently prohibited from going live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspended: Option<bool>,
    /// RTMP URL the stream is relayed to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtmp_relay: Option<String>,
    /// Time at which the last stream ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_streamed: Option<DateTime<Utc>>,
}

/// Combined stream information returned by discovery routes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AggregateStream {
    /// Internal ID.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<StreamId>,
    /// User information.
    pub user: User,
    /// Stream information.
    pub stream: Stream,
    /// Category information.
    pub category: Category,
    /// Region the stream is live from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
    /// Number of followers this stream has.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follower_count: Option<i64>,
}

/// A user account.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    /// Internal ID.
    #[serde(rename = "_id")]
    pub id: UserId,
    /// Path at which this user is accessible.
    pub path: String,
    /// Case-sensitive username.
    pub username: String,
    /// ID of the avatar file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// ID of the banner file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    /// Profile bio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Social links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_links: Option<Vec<SocialLink>>,
    /// Accent colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent_colour: Option<String>,
    /// Whether this user is privileged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privileged: Option<bool>,
    /// Hide the user and their stream from public discovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    /// Whether this user is globally chat muted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_restricted: Option<bool>,
    /// Other users this user is following. Request only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub following: Option<Vec<User>>,
    /// IDs of other users this user is following. Request only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub following_ids: Option<Vec<UserId>>,
}

/// A stream category.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Category {
    /// Internal ID.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CategoryId>,
    /// Title for this category.
    pub title: String,
    /// ID of the cover picture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    /// Category description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Bans for a stream, with the banned users' details.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BanList {
    /// The bans themselves.
    pub bans: Vec<Ban>,
    /// Details of the banned users.
    pub users: Vec<User>,
}

/// A chat ban.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ban {
    /// Internal ID.
    #[serde(rename = "_id")]
    pub id: String,
    /// Stream the ban applies to.
    pub stream_id: StreamId,
    /// Banned user.
    pub user_id: UserId,
    /// Moderator who issued the ban.
    pub mod_id: UserId,
    /// Ban reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// When the ban expires; absent means permanent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
}

/// One of the current user's own bans.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BanInformation {
    /// Stream the ban applies to.
    pub stream_id: StreamId,
    /// When the ban expires; absent means permanent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
}

/// Minimal user details for display in chat.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserInformation {
    /// User ID.
    pub id: UserId,
    /// Path at which this user is accessible.
    pub path: String,
    /// Case-sensitive username.
    pub username: String,
    /// ID of the avatar file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Accent colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent_colour: Option<String>,
}

/// A chat message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// Internal ID.
    #[serde(rename = "_id")]
    pub id: MessageId,
    /// Stream the message was sent in.
    pub stream_id: StreamId,
    /// Author details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<UserInformation>,
    /// Author's user ID.
    pub author_id: UserId,
    /// Message content.
    pub content: String,
}

/// A streaming invite.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InviteInformation {
    /// Invite code.
    pub id: String,
    /// Whether the invite has been claimed.
    pub used: bool,
    /// Who claimed it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<UserId>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
