use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use baladi_core::{StoreError, StoreResult};
use baladi_offer::model::{Offer, OfferStatus, Redemption, RedemptionStatus};
use baladi_offer::store::{OfferStore, RedemptionAttempt, RedemptionOutcome};
use baladi_venue::filters::VenueFilters;
use baladi_venue::model::{Venue, VenueStatus, VenueVisit};
use baladi_venue::search::VenueStore;

/// In-memory store backing tests and local development. A single mutex spans
/// each redemption, which trivially serializes the check-then-increment
/// sequence the way the Postgres row lock does.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    offers: HashMap<Uuid, Offer>,
    redemptions: Vec<Redemption>,
    venues: HashMap<Uuid, Venue>,
    visits: Vec<VenueVisit>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_offer(&self, offer: Offer) {
        self.inner.lock().unwrap().offers.insert(offer.id, offer);
    }

    pub fn seed_venue(&self, venue: Venue) {
        self.inner.lock().unwrap().venues.insert(venue.id, venue);
    }
}

fn count_active(redemptions: &[Redemption], offer_id: Uuid, user_id: Uuid) -> i64 {
    redemptions
        .iter()
        .filter(|r| {
            r.offer_id == offer_id
                && r.user_id == user_id
                && r.status != RedemptionStatus::Cancelled
        })
        .count() as i64
}

#[async_trait]
impl OfferStore for MemoryStore {
    async fn get_offer(&self, id: Uuid) -> StoreResult<Option<Offer>> {
        Ok(self.inner.lock().unwrap().offers.get(&id).cloned())
    }

    async fn count_user_redemptions(&self, offer_id: Uuid, user_id: Uuid) -> StoreResult<i64> {
        let inner = self.inner.lock().unwrap();
        Ok(count_active(&inner.redemptions, offer_id, user_id))
    }

    async fn execute_redemption(
        &self,
        attempt: RedemptionAttempt,
    ) -> StoreResult<RedemptionOutcome> {
        let mut inner = self.inner.lock().unwrap();

        let offer = inner
            .offers
            .get(&attempt.offer_id)
            .cloned()
            .ok_or(StoreError::NotFound)?;

        if let Some(reason) = offer.deny_reason(attempt.now) {
            return Ok(RedemptionOutcome::Denied(reason));
        }
        if offer.usage_limit_per_user.is_some() {
            let prior = count_active(&inner.redemptions, attempt.offer_id, attempt.user_id);
            if !offer.user_within_limit(prior) {
                return Ok(RedemptionOutcome::UserLimitExceeded);
            }
        }

        let redemption = Redemption {
            id: Uuid::new_v4(),
            offer_id: attempt.offer_id,
            user_id: attempt.user_id,
            redeemed_at: attempt.now,
            verification_code: attempt.verification_code,
            status: RedemptionStatus::Completed,
            metadata: attempt.metadata,
        };
        inner.redemptions.push(redemption.clone());
        inner
            .offers
            .get_mut(&attempt.offer_id)
            .expect("offer present under the same lock")
            .used_count += 1;
        Ok(RedemptionOutcome::Recorded(redemption))
    }

    async fn create_offer(&self, offer: &Offer) -> StoreResult<()> {
        self.inner
            .lock()
            .unwrap()
            .offers
            .insert(offer.id, offer.clone());
        Ok(())
    }

    async fn set_offer_status(&self, id: Uuid, status: OfferStatus) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let offer = inner.offers.get_mut(&id).ok_or(StoreError::NotFound)?;
        offer.status = status;
        Ok(())
    }

    async fn soft_delete_offer(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let offer = inner.offers.get_mut(&id).ok_or(StoreError::NotFound)?;
        offer.deleted_at = Some(now);
        Ok(())
    }

    async fn cancel_redemption(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let redemption = inner
            .redemptions
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound)?;
        redemption.status = RedemptionStatus::Cancelled;
        Ok(())
    }

    async fn list_redemptions_for_offer(&self, offer_id: Uuid) -> StoreResult<Vec<Redemption>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<Redemption> = inner
            .redemptions
            .iter()
            .filter(|r| r.offer_id == offer_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.redeemed_at.cmp(&a.redeemed_at));
        Ok(rows)
    }
}

#[async_trait]
impl VenueStore for MemoryStore {
    async fn get_venue(&self, id: Uuid) -> StoreResult<Option<Venue>> {
        Ok(self.inner.lock().unwrap().venues.get(&id).cloned())
    }

    async fn fetch_candidates(&self, filters: &VenueFilters) -> StoreResult<Vec<Venue>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .venues
            .values()
            .filter(|v| v.is_listed() && filters.matches(v))
            .cloned()
            .collect())
    }

    async fn create_venue(&self, venue: &Venue) -> StoreResult<()> {
        self.inner
            .lock()
            .unwrap()
            .venues
            .insert(venue.id, venue.clone());
        Ok(())
    }

    async fn set_venue_status(&self, id: Uuid, status: VenueStatus) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let venue = inner.venues.get_mut(&id).ok_or(StoreError::NotFound)?;
        venue.status = status;
        Ok(())
    }

    async fn soft_delete_venue(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let venue = inner.venues.get_mut(&id).ok_or(StoreError::NotFound)?;
        venue.deleted_at = Some(now);
        Ok(())
    }

    async fn record_visit(
        &self,
        venue_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
        source: &str,
    ) -> StoreResult<VenueVisit> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.venues.contains_key(&venue_id) {
            return Err(StoreError::NotFound);
        }
        if let Some(existing) = inner.visits.iter().find(|v| {
            v.venue_id == venue_id
                && v.user_id == user_id
                && v.visited_at.date_naive() == now.date_naive()
        }) {
            return Ok(existing.clone());
        }
        let visit = VenueVisit {
            id: Uuid::new_v4(),
            venue_id,
            user_id,
            visited_at: now,
            source: source.to_string(),
        };
        inner.visits.push(visit.clone());
        inner
            .venues
            .get_mut(&venue_id)
            .expect("venue present under the same lock")
            .total_visits += 1;
        Ok(visit)
    }
}
