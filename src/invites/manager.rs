use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::InviteSettings;
use crate::error::InviteError;
use crate::invites::clock::{Clock, SystemClock};
use crate::invites::code;
use crate::invites::store::{FieldValue, InviteField, InviteStore};
use crate::models::invites::{
    EventTag, InviteLink, InviteSummary, IssuedInvite, NewInviteLink, Rejection,
    ValidationOutcome,
};

/// Issues, validates and redeems invite links.
///
/// Holds no mutable state of its own; every call re-reads the store, so clones
/// can be handed to each request.
#[derive(Clone)]
pub struct InviteLinkManager {
    store: Arc<dyn InviteStore>,
    clock: Arc<dyn Clock>,
    settings: InviteSettings,
}

impl InviteLinkManager {
    pub fn new(store: Arc<dyn InviteStore>, settings: InviteSettings) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), settings)
    }

    pub fn with_clock(
        store: Arc<dyn InviteStore>,
        clock: Arc<dyn Clock>,
        settings: InviteSettings,
    ) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    /// Creates a fresh, unused invite for `event` owned by `user_id`.
    ///
    /// Outstanding invites for the same host and event are left alone.
    pub async fn issue(&self, event: EventTag, user_id: &str) -> Result<IssuedInvite, InviteError> {
        if user_id.trim().is_empty() {
            return Err(InviteError::InvalidArgument(
                "userId must not be empty".to_string(),
            ));
        }
        if self.settings.code_length == 0 || self.settings.code_length > code::MAX_CODE_LENGTH {
            return Err(InviteError::InvalidArgument(format!(
                "invite code length must be between 1 and {}",
                code::MAX_CODE_LENGTH
            )));
        }

        let code = self.unclaimed_code().await?;
        let created_at = self.clock.now();
        let expires_at = created_at + self.settings.ttl;
        let record = NewInviteLink {
            code,
            user_id: user_id.to_string(),
            event,
            is_used: false,
            created_at,
            expires_at,
        };

        let invite_id = self.store.insert(&record).await?;
        info!(
            %invite_id,
            %event,
            user_id,
            code_prefix = code_prefix(&record.code),
            %expires_at,
            "issued invite link"
        );

        Ok(IssuedInvite {
            code: record.code,
            event,
            user_id: record.user_id,
            expires_at,
        })
    }

    /// Checks whether `code` can still be used. Unknown, expired and used
    /// codes come back as `ValidationOutcome::Invalid`, not as errors.
    pub async fn validate(&self, code: &str) -> Result<ValidationOutcome, InviteError> {
        let Some(link) = self.resolve(code).await? else {
            debug!(code_prefix = code_prefix(code), "invite code not found");
            return Ok(ValidationOutcome::Invalid(Rejection::NotFound));
        };

        // A used invite reports "used" even once it has also expired.
        let outcome = if link.is_used {
            ValidationOutcome::Invalid(Rejection::AlreadyUsed)
        } else if link.is_expired_at(self.clock.now()) {
            ValidationOutcome::Invalid(Rejection::Expired)
        } else {
            ValidationOutcome::Valid {
                event: link.event,
                user_id: link.user_id,
            }
        };
        debug!(invite_id = %link.id, valid = outcome.is_valid(), "validated invite code");
        Ok(outcome)
    }

    /// Marks the invite behind `code` as used.
    ///
    /// Call only after the step the invite gates (creating the guest) has
    /// succeeded. Returns `false` when there is nothing to redeem: unknown
    /// code, already used, expired, or another request won the race.
    pub async fn redeem(&self, code: &str) -> Result<bool, InviteError> {
        let Some(link) = self.resolve(code).await? else {
            return Ok(false);
        };
        if link.is_used {
            debug!(invite_id = %link.id, "invite already redeemed");
            return Ok(false);
        }
        if link.is_expired_at(self.clock.now()) {
            debug!(invite_id = %link.id, "refusing to redeem expired invite");
            return Ok(false);
        }

        let flipped = self
            .store
            .update_field_if(
                link.id,
                InviteField::IsUsed,
                &FieldValue::Bool(false),
                &FieldValue::Bool(true),
            )
            .await?;
        if flipped {
            info!(
                invite_id = %link.id,
                event = %link.event,
                user_id = %link.user_id,
                "redeemed invite link"
            );
        } else {
            warn!(invite_id = %link.id, "invite was redeemed concurrently");
        }
        Ok(flipped)
    }

    /// Every invite `user_id` has issued, newest first, with its current status.
    pub async fn list_for_host(&self, user_id: &str) -> Result<Vec<InviteSummary>, InviteError> {
        if user_id.trim().is_empty() {
            return Err(InviteError::InvalidArgument(
                "userId must not be empty".to_string(),
            ));
        }
        let now = self.clock.now();
        let links = self
            .store
            .find_by_field(InviteField::UserId, &FieldValue::Text(user_id.to_string()))
            .await?;

        Ok(links
            .into_iter()
            .rev()
            .map(|link| InviteSummary {
                status: link.status_at(now),
                code: link.code,
                event: link.event,
                created_at: link.created_at,
                expires_at: link.expires_at,
            })
            .collect())
    }

    // First match wins when a code resolves to several documents. Input that
    // `code::generate` could never produce is a miss and skips the store.
    async fn resolve(&self, code: &str) -> Result<Option<InviteLink>, InviteError> {
        if !code::is_well_formed(code) {
            return Ok(None);
        }
        let matches = self
            .store
            .find_by_field(InviteField::Code, &FieldValue::Text(code.to_string()))
            .await?;
        if matches.len() > 1 {
            warn!(
                code_prefix = code_prefix(code),
                matches = matches.len(),
                "invite code resolves to several invites; using the oldest"
            );
        }
        Ok(matches.into_iter().next())
    }

    // A code is "taken" as long as any document carries it, whatever its state.
    // The lookup and the later insert are separate steps, so two concurrent
    // issues can still land on the same code; `resolve` then picks the oldest.
    async fn unclaimed_code(&self) -> Result<String, InviteError> {
        let attempts = self.settings.max_code_attempts;
        for attempt in 1..=attempts {
            let candidate = code::generate(self.settings.code_length);
            let taken = self
                .store
                .find_by_field(InviteField::Code, &FieldValue::Text(candidate.clone()))
                .await?;
            if taken.is_empty() {
                return Ok(candidate);
            }
            warn!(
                attempt,
                code_length = self.settings.code_length,
                "generated invite code is already taken; regenerating"
            );
        }
        Err(InviteError::CodeSpaceExhausted { attempts })
    }
}

// Codes are bearer tokens; logs only ever see the first two characters.
fn code_prefix(code: &str) -> &str {
    code.get(..2).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invites::clock::ManualClock;
    use crate::invites::memory::MemoryInviteStore;
    use crate::invites::store::StoreError;
    use chrono::{Duration, TimeZone, Utc};

    fn start() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 10, 0, 0).unwrap()
    }

    fn setup() -> (InviteLinkManager, MemoryInviteStore, ManualClock) {
        setup_with(InviteSettings::default())
    }

    fn setup_with(settings: InviteSettings) -> (InviteLinkManager, MemoryInviteStore, ManualClock) {
        let store = MemoryInviteStore::new();
        let clock = ManualClock::new(start());
        let manager =
            InviteLinkManager::with_clock(Arc::new(store.clone()), Arc::new(clock.clone()), settings);
        (manager, store, clock)
    }

    async fn seed(store: &MemoryInviteStore, code: &str, is_used: bool, created_at: chrono::DateTime<Utc>) {
        store
            .insert(&NewInviteLink {
                code: code.to_string(),
                user_id: "user-7".to_string(),
                event: EventTag::Mehendi,
                is_used,
                created_at,
                expires_at: created_at + Duration::days(7),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn haldi_invite_full_lifecycle() {
        let (manager, _, _) = setup();

        let issued = manager.issue(EventTag::Haldi, "user-42").await.unwrap();
        assert_eq!(issued.code.len(), 7);
        assert!(issued
            .code
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert_eq!(issued.expires_at, start() + Duration::days(7));

        assert_eq!(
            manager.validate(&issued.code).await.unwrap(),
            ValidationOutcome::Valid {
                event: EventTag::Haldi,
                user_id: "user-42".to_string(),
            }
        );

        assert!(manager.redeem(&issued.code).await.unwrap());

        let after = manager.validate(&issued.code).await.unwrap();
        assert_eq!(after, ValidationOutcome::Invalid(Rejection::AlreadyUsed));
        assert_eq!(
            serde_json::to_value(&after).unwrap(),
            serde_json::json!({
                "isValid": false,
                "isUsed": true,
                "message": "This invite link has already been used"
            })
        );
    }

    #[tokio::test]
    async fn unknown_code_is_invalid_not_an_error() {
        let (manager, _, _) = setup();
        let outcome = manager.validate("zzzzzzz").await.unwrap();
        assert_eq!(outcome, ValidationOutcome::Invalid(Rejection::NotFound));
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({"isValid": false, "message": "Invalid invite code"})
        );
    }

    #[tokio::test]
    async fn malformed_code_is_a_miss_even_when_the_store_is_down() {
        let (manager, store, _) = setup();
        store.set_unavailable(true);
        let too_long = "a".repeat(65);

        for code in ["ab\0cdef", "", "AB12CD3", "ab%00cd", too_long.as_str()] {
            assert_eq!(
                manager.validate(code).await.unwrap(),
                ValidationOutcome::Invalid(Rejection::NotFound)
            );
            assert!(!manager.redeem(code).await.unwrap());
        }
    }

    #[tokio::test]
    async fn issue_rejects_blank_host() {
        let (manager, store, _) = setup();
        for user_id in ["", "   "] {
            let err = manager.issue(EventTag::Wedding, user_id).await.unwrap_err();
            assert!(matches!(err, InviteError::InvalidArgument(_)));
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn issue_rejects_out_of_range_code_length() {
        for code_length in [0, code::MAX_CODE_LENGTH + 1] {
            let (manager, store, _) = setup_with(InviteSettings {
                code_length,
                ..InviteSettings::default()
            });
            let err = manager.issue(EventTag::Wedding, "user-1").await.unwrap_err();
            assert!(matches!(err, InviteError::InvalidArgument(_)));
            assert!(store.is_empty());
        }
    }

    #[tokio::test]
    async fn invite_expires_after_seven_days() {
        let (manager, _, clock) = setup();
        let issued = manager.issue(EventTag::Reception, "user-1").await.unwrap();

        clock.advance(Duration::days(7));
        assert!(manager.validate(&issued.code).await.unwrap().is_valid());

        clock.advance(Duration::seconds(1));
        assert_eq!(
            manager.validate(&issued.code).await.unwrap(),
            ValidationOutcome::Invalid(Rejection::Expired)
        );
        assert!(!manager.redeem(&issued.code).await.unwrap());
    }

    #[tokio::test]
    async fn used_code_is_rejected_as_used() {
        let (manager, store, _) = setup();
        seed(&store, "used001", true, start() - Duration::days(1)).await;

        let outcome = manager.validate("used001").await.unwrap();
        assert_eq!(outcome, ValidationOutcome::Invalid(Rejection::AlreadyUsed));
    }

    #[tokio::test]
    async fn used_flag_wins_over_expiry() {
        let (manager, store, _) = setup();
        seed(&store, "old0001", true, start() - Duration::days(30)).await;
        seed(&store, "old0002", false, start() - Duration::days(30)).await;

        assert_eq!(
            manager.validate("old0001").await.unwrap(),
            ValidationOutcome::Invalid(Rejection::AlreadyUsed)
        );
        assert_eq!(
            manager.validate("old0002").await.unwrap(),
            ValidationOutcome::Invalid(Rejection::Expired)
        );
    }

    #[tokio::test]
    async fn redeem_unknown_code_has_no_side_effect() {
        let (manager, store, _) = setup();
        seed(&store, "keep001", false, start()).await;

        assert!(!manager.redeem("nothere").await.unwrap());

        let kept = store
            .find_by_field(InviteField::Code, &FieldValue::Text("keep001".into()))
            .await
            .unwrap();
        assert!(!kept[0].is_used);
    }

    #[tokio::test]
    async fn second_redeem_returns_false() {
        let (manager, _, _) = setup();
        let issued = manager.issue(EventTag::Sangeet, "user-1").await.unwrap();
        assert!(manager.redeem(&issued.code).await.unwrap());
        assert!(!manager.redeem(&issued.code).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_redemptions_yield_one_winner() {
        let (manager, _, _) = setup();
        let issued = manager.issue(EventTag::Wedding, "user-1").await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let manager = manager.clone();
                let code = issued.code.clone();
                tokio::spawn(async move { manager.redeem(&code).await })
            })
            .collect();

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn repeated_issue_gives_independent_codes() {
        let (manager, _, _) = setup();
        let first = manager.issue(EventTag::Haldi, "user-42").await.unwrap();
        let second = manager.issue(EventTag::Haldi, "user-42").await.unwrap();
        assert_ne!(first.code, second.code);

        assert!(manager.redeem(&first.code).await.unwrap());
        assert!(manager.validate(&second.code).await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn duplicate_codes_resolve_to_oldest_document() {
        let (manager, store, _) = setup();
        seed(&store, "dupe001", true, start() - Duration::hours(2)).await;
        seed(&store, "dupe001", false, start() - Duration::hours(1)).await;

        assert_eq!(
            manager.validate("dupe001").await.unwrap(),
            ValidationOutcome::Invalid(Rejection::AlreadyUsed)
        );
        assert!(!manager.redeem("dupe001").await.unwrap());
    }

    #[tokio::test]
    async fn colliding_codes_are_regenerated() {
        let (manager, store, _) = setup_with(InviteSettings {
            code_length: 1,
            max_code_attempts: 10_000,
            ..InviteSettings::default()
        });
        // Leave exactly one single-character code free.
        for symbol in "abcdefghijklmnopqrstuvwxyz012345678".chars() {
            seed(&store, &symbol.to_string(), false, start()).await;
        }

        let issued = manager.issue(EventTag::Haldi, "user-1").await.unwrap();
        assert_eq!(issued.code, "9");
    }

    #[tokio::test]
    async fn exhausted_code_space_is_reported() {
        let (manager, store, _) = setup_with(InviteSettings {
            code_length: 1,
            max_code_attempts: 3,
            ..InviteSettings::default()
        });
        for symbol in "abcdefghijklmnopqrstuvwxyz0123456789".chars() {
            seed(&store, &symbol.to_string(), true, start() - Duration::days(60)).await;
        }

        let err = manager.issue(EventTag::Haldi, "user-1").await.unwrap_err();
        assert!(matches!(err, InviteError::CodeSpaceExhausted { attempts: 3 }));
        assert_eq!(store.len(), 36);
    }

    #[tokio::test]
    async fn storage_outage_surfaces_as_storage_failure() {
        let (manager, store, _) = setup();
        let issued = manager.issue(EventTag::Haldi, "user-1").await.unwrap();
        store.set_unavailable(true);

        assert!(matches!(
            manager.issue(EventTag::Haldi, "user-1").await,
            Err(InviteError::Storage(StoreError::Backend(_)))
        ));
        assert!(matches!(
            manager.validate(&issued.code).await,
            Err(InviteError::Storage(_))
        ));
        assert!(matches!(
            manager.redeem(&issued.code).await,
            Err(InviteError::Storage(_))
        ));

        store.set_unavailable(false);
        assert!(manager.validate(&issued.code).await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn host_listing_is_newest_first_with_status() {
        let (manager, _, clock) = setup();
        let first = manager.issue(EventTag::Haldi, "user-42").await.unwrap();
        clock.advance(Duration::hours(1));
        let second = manager.issue(EventTag::Wedding, "user-42").await.unwrap();
        manager.issue(EventTag::Wedding, "someone-else").await.unwrap();
        manager.redeem(&second.code).await.unwrap();

        let listed = manager.list_for_host("user-42").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].code, second.code);
        assert_eq!(listed[0].status, crate::models::invites::InviteStatus::Used);
        assert_eq!(listed[1].code, first.code);
        assert_eq!(listed[1].status, crate::models::invites::InviteStatus::Active);

        clock.advance(Duration::days(8));
        let listed = manager.list_for_host("user-42").await.unwrap();
        assert_eq!(listed[1].status, crate::models::invites::InviteStatus::Expired);
    }

    #[test]
    fn code_prefix_never_panics() {
        assert_eq!(code_prefix("ab12cd3"), "ab");
        assert_eq!(code_prefix("a"), "");
        assert_eq!(code_prefix(""), "");
    }
}
