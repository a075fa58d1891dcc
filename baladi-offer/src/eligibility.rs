use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use baladi_core::clock::Clock;
use baladi_core::identity::RequestContext;
use baladi_core::StoreError;

use crate::code;
use crate::model::{DenialReason, Redemption};
use crate::store::{OfferStore, RedemptionAttempt, RedemptionOutcome};

#[derive(Debug, thiserror::Error)]
pub enum RedeemError {
    #[error("offer is not redeemable: {0}")]
    NotRedeemable(DenialReason),

    #[error("per-user redemption limit reached")]
    UserLimitExceeded,

    #[error("redemption still contended after {attempts} attempts")]
    ContentionExceeded { attempts: u32 },

    #[error("offer not found")]
    OfferNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Retry policy for the transactional redemption path. The backoff grows
/// linearly with the attempt number.
#[derive(Debug, Clone)]
pub struct EligibilityConfig {
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_backoff: Duration::from_millis(25),
        }
    }
}

/// Gates and executes offer redemption with exactly-once-per-limit semantics.
pub struct EligibilityEngine {
    store: Arc<dyn OfferStore>,
    clock: Arc<dyn Clock>,
    config: EligibilityConfig,
}

impl EligibilityEngine {
    pub fn new(store: Arc<dyn OfferStore>, clock: Arc<dyn Clock>, config: EligibilityConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Whether the offer can currently be redeemed by anyone.
    pub async fn is_redeemable(&self, offer_id: Uuid) -> Result<bool, RedeemError> {
        let offer = self
            .store
            .get_offer(offer_id)
            .await?
            .ok_or(RedeemError::OfferNotFound)?;
        Ok(offer.is_redeemable(self.clock.now()))
    }

    /// Whether this user can currently redeem the offer. Advisory: `redeem`
    /// re-validates inside the store transaction.
    pub async fn can_user_redeem(&self, offer_id: Uuid, user_id: Uuid) -> Result<bool, RedeemError> {
        let offer = self
            .store
            .get_offer(offer_id)
            .await?
            .ok_or(RedeemError::OfferNotFound)?;
        if !offer.is_redeemable(self.clock.now()) {
            return Ok(false);
        }
        if offer.usage_limit_per_user.is_none() {
            return Ok(true);
        }
        let prior = self
            .store
            .count_user_redemptions(offer_id, user_id)
            .await?;
        Ok(offer.user_within_limit(prior))
    }

    /// Records a redemption, retrying bounded times on transaction conflicts.
    /// Either a redemption row exists and used_count moved by exactly one, or
    /// a specific error tells the caller whether a retry could ever succeed.
    pub async fn redeem(
        &self,
        offer_id: Uuid,
        user_id: Uuid,
        ctx: &RequestContext,
    ) -> Result<Redemption, RedeemError> {
        let mut attempt_no: u32 = 0;
        loop {
            attempt_no += 1;
            let attempt = RedemptionAttempt {
                offer_id,
                user_id,
                now: self.clock.now(),
                verification_code: code::verification_code(),
                metadata: ctx.to_metadata(),
            };
            match self.store.execute_redemption(attempt).await {
                Ok(RedemptionOutcome::Recorded(redemption)) => return Ok(redemption),
                Ok(RedemptionOutcome::Denied(reason)) => {
                    return Err(RedeemError::NotRedeemable(reason))
                }
                Ok(RedemptionOutcome::UserLimitExceeded) => {
                    return Err(RedeemError::UserLimitExceeded)
                }
                Err(StoreError::NotFound) => return Err(RedeemError::OfferNotFound),
                Err(StoreError::Conflict) if attempt_no < self.config.max_attempts => {
                    tokio::time::sleep(self.config.retry_backoff * attempt_no).await;
                }
                Err(StoreError::Conflict) => {
                    return Err(RedeemError::ContentionExceeded {
                        attempts: attempt_no,
                    })
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
