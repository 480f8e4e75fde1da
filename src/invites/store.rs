//! The persistence contract the invite manager depends on.
//!
//! Backends: `queries::invites::PgInviteStore` (Postgres) and
//! `invites::memory::MemoryInviteStore` (in-process).

use thiserror::Error;

use crate::models::invites::{EventTag, InviteId, InviteLink, NewInviteLink};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invite {0} not found")]
    MissingRecord(InviteId),
    #[error("field `{field}` cannot hold {value}")]
    FieldType {
        field: &'static str,
        value: &'static str,
    },
    #[error("backend error: {0}")]
    Backend(String),
}

/// Queryable/updatable fields of an invite document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteField {
    Code,
    UserId,
    Event,
    IsUsed,
}

impl InviteField {
    /// Document field name.
    pub fn name(&self) -> &'static str {
        match self {
            InviteField::Code => "code",
            InviteField::UserId => "userId",
            InviteField::Event => "event",
            InviteField::IsUsed => "isUsed",
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            InviteField::Code => "code",
            InviteField::UserId => "user_id",
            InviteField::Event => "event",
            InviteField::IsUsed => "is_used",
        }
    }

    /// Rejects values whose type the field cannot hold.
    pub fn check(&self, value: &FieldValue) -> Result<(), StoreError> {
        let fits = matches!(
            (self, value),
            (InviteField::Code | InviteField::UserId, FieldValue::Text(_))
                | (InviteField::Event, FieldValue::Event(_))
                | (InviteField::IsUsed, FieldValue::Bool(_))
        );
        if fits {
            Ok(())
        } else {
            Err(StoreError::FieldType {
                field: self.name(),
                value: value.kind(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Event(EventTag),
    Bool(bool),
}

impl FieldValue {
    fn kind(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "a text value",
            FieldValue::Event(_) => "an event tag",
            FieldValue::Bool(_) => "a boolean",
        }
    }
}

#[async_trait::async_trait]
pub trait InviteStore: Send + Sync {
    /// Append a new invite document and return its store-assigned identity.
    async fn insert(&self, record: &NewInviteLink) -> Result<InviteId, StoreError>;

    /// Equality lookup, ordered by `created_at` ascending, then identity.
    async fn find_by_field(
        &self,
        field: InviteField,
        value: &FieldValue,
    ) -> Result<Vec<InviteLink>, StoreError>;

    /// Single-field write to one existing document.
    async fn update_field(
        &self,
        id: InviteId,
        field: InviteField,
        value: &FieldValue,
    ) -> Result<(), StoreError>;

    /// Write `value` only if the field currently equals `expected`, as one
    /// atomic step. Returns `false` when the current value differs.
    async fn update_field_if(
        &self,
        id: InviteId,
        field: InviteField,
        expected: &FieldValue,
        value: &FieldValue,
    ) -> Result<bool, StoreError>;
}
