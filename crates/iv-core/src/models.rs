//! # Domain Models
//!
//! These structs represent the core entities of IdeaVault.
//! The store assigns ids (UUID v4) and both timestamps on creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emotional tone of an idea. A closed set: anything else read back from
/// the store surfaces as `Unknown`, which no aggregation bucket counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Happy,
    Playful,
    Dreamy,
    Wild,
    #[serde(other)]
    Unknown,
}

impl Mood {
    /// The four recognized moods, in display order.
    pub const KNOWN: [Mood; 4] = [Mood::Happy, Mood::Playful, Mood::Dreamy, Mood::Wild];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Playful => "playful",
            Mood::Dreamy => "dreamy",
            Mood::Wild => "wild",
            Mood::Unknown => "unknown",
        }
    }

    /// Parses a stored value. Unrecognized strings degrade to `Unknown`
    /// rather than erroring; they must never crash a view.
    pub fn parse(value: &str) -> Mood {
        match value {
            "happy" => Mood::Happy,
            "playful" => Mood::Playful,
            "dreamy" => Mood::Dreamy,
            "wild" => Mood::Wild,
            _ => Mood::Unknown,
        }
    }
}

/// Lifecycle state of an idea. Closed set with the same `Unknown` rule
/// as [`Mood`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Open,
    Completed,
    Discarded,
    #[serde(other)]
    Unknown,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::Completed => "completed",
            Status::Discarded => "discarded",
            Status::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Status {
        match value {
            "open" => Status::Open,
            "completed" => Status::Completed,
            "discarded" => Status::Discarded,
            _ => Status::Unknown,
        }
    }
}

/// The single persisted note entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Idea {
    pub id: Uuid,
    /// Owner scope: every read and mutation is restricted to this user.
    pub user_id: String,
    pub text: String,
    /// Unordered for matching, order-preserving for display. May be empty.
    pub tags: Vec<String>,
    pub mood: Mood,
    pub favorite: bool,
    pub status: Status,
    /// Public URL of an attached image, if any.
    pub image_url: Option<String>,
    /// Immutable after creation; the sole key for temporal bucketing.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creation payload. The store assigns id and timestamps; `status`
/// defaults to `open` and `mood` to `happy` when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdeaDraft {
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub mood: Mood,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Partial update payload. Unset fields are left unchanged; the store
/// restamps `updated_at` on every successful merge. `created_at` is not
/// patchable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdeaPatch {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub mood: Option<Mood>,
    #[serde(default)]
    pub favorite: Option<bool>,
    #[serde(default)]
    pub status: Option<Status>,
    /// `Some(None)` clears the image; `None` leaves it unchanged.
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Option<String>>,
}

/// An authenticated session: an opaque bearer token bound to a user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: String,
}

/// Serde helper distinguishing "field absent" from "field set to null"
/// for `Option<Option<T>>` patch fields.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
