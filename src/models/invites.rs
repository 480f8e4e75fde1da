use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::error::InviteError;

/// Store-assigned identity of an invite document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct InviteId(pub Uuid);

impl fmt::Display for InviteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_tag")]
pub enum EventTag {
    Engagement,
    Haldi,
    Mehendi,
    Sangeet,
    Wedding,
    Reception,
}

impl EventTag {
    pub const ALL: [EventTag; 6] = [
        EventTag::Engagement,
        EventTag::Haldi,
        EventTag::Mehendi,
        EventTag::Sangeet,
        EventTag::Wedding,
        EventTag::Reception,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventTag::Engagement => "Engagement",
            EventTag::Haldi => "Haldi",
            EventTag::Mehendi => "Mehendi",
            EventTag::Sangeet => "Sangeet",
            EventTag::Wedding => "Wedding",
            EventTag::Reception => "Reception",
        }
    }
}

impl fmt::Display for EventTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventTag {
    type Err = InviteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| InviteError::InvalidArgument(format!("Unknown event: {}", s)))
    }
}

/*
id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
code TEXT NOT NULL,
user_id TEXT NOT NULL,
event event_tag NOT NULL,
is_used BOOLEAN NOT NULL DEFAULT FALSE,
created_at TIMESTAMPTZ NOT NULL,
expires_at TIMESTAMPTZ NOT NULL,
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InviteLink {
    pub id: InviteId,
    pub code: String,
    pub user_id: String,
    pub event: EventTag,
    pub is_used: bool,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    pub expires_at: DateTime<Utc>,
}

impl InviteLink {
    /// Expiry is exclusive of the boundary: the invite still works at `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> InviteStatus {
        if self.is_used {
            InviteStatus::Used
        } else if self.is_expired_at(now) {
            InviteStatus::Expired
        } else {
            InviteStatus::Active
        }
    }
}

/// An invite document that has not been assigned an identity yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInviteLink {
    pub code: String,
    pub user_id: String,
    pub event: EventTag,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Active,
    Used,
    Expired,
}

/// Host-facing view of an invite.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteSummary {
    pub code: String,
    pub event: EventTag,
    pub status: InviteStatus,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedInvite {
    pub code: String,
    pub event: EventTag,
    pub user_id: String,
    #[serde(with = "iso_millis")]
    pub expires_at: DateTime<Utc>,
}

/// Why a code cannot be used right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotFound,
    Expired,
    AlreadyUsed,
}

impl Rejection {
    pub fn message(&self) -> &'static str {
        match self {
            Rejection::NotFound => "Invalid invite code",
            Rejection::Expired => "This invite link has expired",
            Rejection::AlreadyUsed => "This invite link has already been used",
        }
    }
}

/// Result of checking a code on the public redemption page.
///
/// Serializes as `{"isValid": true, "event", "userId"}` or
/// `{"isValid": false, "message"}`, with `"isUsed": true` added for used codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid { event: EventTag, user_id: String },
    Invalid(Rejection),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid { .. })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationWire<'a> {
    is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_used: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<EventTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
}

impl Serialize for ValidationOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            ValidationOutcome::Valid { event, user_id } => ValidationWire {
                is_valid: true,
                message: None,
                is_used: None,
                event: Some(*event),
                user_id: Some(user_id.as_str()),
            },
            ValidationOutcome::Invalid(rejection) => ValidationWire {
                is_valid: false,
                message: Some(rejection.message()),
                is_used: (*rejection == Rejection::AlreadyUsed).then_some(true),
                event: None,
                user_id: None,
            },
        };
        wire.serialize(serializer)
    }
}

/// ISO-8601 UTC timestamps with millisecond precision, e.g. `2026-10-16T08:30:00.000Z`.
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
