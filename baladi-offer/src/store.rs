use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use baladi_core::StoreResult;

use crate::model::{DenialReason, Offer, OfferStatus, Redemption};

/// A single redemption attempt, fully resolved by the engine before it is
/// handed to the store.
#[derive(Debug, Clone)]
pub struct RedemptionAttempt {
    pub offer_id: Uuid,
    pub user_id: Uuid,
    pub now: DateTime<Utc>,
    pub verification_code: String,
    pub metadata: serde_json::Value,
}

/// Outcome of the transactional check-then-record sequence.
#[derive(Debug)]
pub enum RedemptionOutcome {
    Recorded(Redemption),
    Denied(DenialReason),
    UserLimitExceeded,
}

/// Repository trait for offer data access.
#[async_trait]
pub trait OfferStore: Send + Sync {
    async fn get_offer(&self, id: Uuid) -> StoreResult<Option<Offer>>;

    /// Prior redemptions of an offer by one user, cancelled rows excluded.
    async fn count_user_redemptions(&self, offer_id: Uuid, user_id: Uuid) -> StoreResult<i64>;

    /// Re-checks eligibility and records the redemption atomically. The offer
    /// row is locked (or the whole transaction serialized) so the check and
    /// the used_count increment can never interleave with a concurrent
    /// attempt; a redemption row without its increment is unobservable.
    /// Returns StoreError::Conflict when the transaction lost a race and the
    /// caller should retry, StoreError::NotFound when the offer id is unknown.
    async fn execute_redemption(&self, attempt: RedemptionAttempt)
        -> StoreResult<RedemptionOutcome>;

    async fn create_offer(&self, offer: &Offer) -> StoreResult<()>;

    async fn set_offer_status(&self, id: Uuid, status: OfferStatus) -> StoreResult<()>;

    /// Sets the tombstone; rows are never hard-erased.
    async fn soft_delete_offer(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<()>;

    /// Completed/pending -> cancelled. Cancelled rows stop counting toward
    /// per-user limits but never decrement used_count.
    async fn cancel_redemption(&self, id: Uuid) -> StoreResult<()>;

    async fn list_redemptions_for_offer(&self, offer_id: Uuid) -> StoreResult<Vec<Redemption>>;
}
