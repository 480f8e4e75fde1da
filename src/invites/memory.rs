use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::invites::store::{FieldValue, InviteField, InviteStore, StoreError};
use crate::models::invites::{InviteId, InviteLink, NewInviteLink};

struct StoredInvite {
    // Insertion order, used as the tie-breaker after created_at.
    seq: u64,
    link: InviteLink,
}

/// In-process invite store. Each document sits behind its own map entry, so a
/// `get_mut` guard gives single-document atomicity.
#[derive(Clone, Default)]
pub struct MemoryInviteStore {
    records: Arc<DashMap<InviteId, StoredInvite>>,
    next_seq: Arc<AtomicU64>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryInviteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every call fails with a backend error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("invite store unavailable".to_string()));
        }
        Ok(())
    }
}

fn field_equals(link: &InviteLink, field: InviteField, value: &FieldValue) -> bool {
    match (field, value) {
        (InviteField::Code, FieldValue::Text(code)) => link.code == *code,
        (InviteField::UserId, FieldValue::Text(user_id)) => link.user_id == *user_id,
        (InviteField::Event, FieldValue::Event(event)) => link.event == *event,
        (InviteField::IsUsed, FieldValue::Bool(is_used)) => link.is_used == *is_used,
        _ => false,
    }
}

fn assign(link: &mut InviteLink, field: InviteField, value: &FieldValue) {
    match (field, value) {
        (InviteField::Code, FieldValue::Text(code)) => link.code = code.clone(),
        (InviteField::UserId, FieldValue::Text(user_id)) => link.user_id = user_id.clone(),
        (InviteField::Event, FieldValue::Event(event)) => link.event = *event,
        (InviteField::IsUsed, FieldValue::Bool(is_used)) => link.is_used = *is_used,
        // Callers run InviteField::check first.
        _ => {}
    }
}

#[async_trait::async_trait]
impl InviteStore for MemoryInviteStore {
    async fn insert(&self, record: &NewInviteLink) -> Result<InviteId, StoreError> {
        self.ensure_available()?;
        let id = InviteId(Uuid::new_v4());
        let link = InviteLink {
            id,
            code: record.code.clone(),
            user_id: record.user_id.clone(),
            event: record.event,
            is_used: record.is_used,
            created_at: record.created_at,
            expires_at: record.expires_at,
        };
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.records.insert(id, StoredInvite { seq, link });
        Ok(id)
    }

    async fn find_by_field(
        &self,
        field: InviteField,
        value: &FieldValue,
    ) -> Result<Vec<InviteLink>, StoreError> {
        self.ensure_available()?;
        field.check(value)?;
        let mut matches: Vec<(u64, InviteLink)> = self
            .records
            .iter()
            .filter(|entry| field_equals(&entry.link, field, value))
            .map(|entry| (entry.seq, entry.link.clone()))
            .collect();
        matches.sort_by(|(a_seq, a), (b_seq, b)| {
            a.created_at.cmp(&b.created_at).then(a_seq.cmp(b_seq))
        });
        Ok(matches.into_iter().map(|(_, link)| link).collect())
    }

    async fn update_field(
        &self,
        id: InviteId,
        field: InviteField,
        value: &FieldValue,
    ) -> Result<(), StoreError> {
        self.ensure_available()?;
        field.check(value)?;
        let mut entry = self
            .records
            .get_mut(&id)
            .ok_or(StoreError::MissingRecord(id))?;
        assign(&mut entry.link, field, value);
        Ok(())
    }

    async fn update_field_if(
        &self,
        id: InviteId,
        field: InviteField,
        expected: &FieldValue,
        value: &FieldValue,
    ) -> Result<bool, StoreError> {
        self.ensure_available()?;
        field.check(expected)?;
        field.check(value)?;
        // The shard stays write-locked until `entry` drops, so the compare and
        // the write cannot interleave with another caller.
        let mut entry = self
            .records
            .get_mut(&id)
            .ok_or(StoreError::MissingRecord(id))?;
        if !field_equals(&entry.link, field, expected) {
            return Ok(false);
        }
        assign(&mut entry.link, field, value);
        Ok(true)
    }
}
