use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use baladi_core::{StoreError, StoreResult};
use baladi_offer::model::{Offer, OfferStatus, Redemption, RedemptionStatus};
use baladi_offer::store::{OfferStore, RedemptionAttempt, RedemptionOutcome};

use crate::database::map_err;

pub struct PostgresOfferStore {
    pool: PgPool,
}

impl PostgresOfferStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const OFFER_COLUMNS: &str = "id, business_id, venue_id, title, title_ar, description, \
     description_ar, start_date, end_date, usage_limit, usage_limit_per_user, used_count, \
     is_active, is_featured, status, created_at, deleted_at";

#[derive(sqlx::FromRow)]
struct OfferRow {
    id: Uuid,
    business_id: Uuid,
    venue_id: Option<Uuid>,
    title: String,
    title_ar: Option<String>,
    description: Option<String>,
    description_ar: Option<String>,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    usage_limit: Option<i32>,
    usage_limit_per_user: Option<i32>,
    used_count: i32,
    is_active: bool,
    is_featured: bool,
    status: String,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl OfferRow {
    fn into_offer(self) -> StoreResult<Offer> {
        let status: OfferStatus = self.status.parse().map_err(StoreError::Backend)?;
        Ok(Offer {
            id: self.id,
            business_id: self.business_id,
            venue_id: self.venue_id,
            title: self.title,
            title_ar: self.title_ar,
            description: self.description,
            description_ar: self.description_ar,
            start_date: self.start_date,
            end_date: self.end_date,
            usage_limit: self.usage_limit,
            usage_limit_per_user: self.usage_limit_per_user,
            used_count: self.used_count,
            is_active: self.is_active,
            is_featured: self.is_featured,
            status,
            created_at: self.created_at,
            deleted_at: self.deleted_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RedemptionRow {
    id: Uuid,
    offer_id: Uuid,
    user_id: Uuid,
    redeemed_at: DateTime<Utc>,
    verification_code: String,
    status: String,
    metadata: serde_json::Value,
}

impl RedemptionRow {
    fn into_redemption(self) -> StoreResult<Redemption> {
        let status: RedemptionStatus = self.status.parse().map_err(StoreError::Backend)?;
        Ok(Redemption {
            id: self.id,
            offer_id: self.offer_id,
            user_id: self.user_id,
            redeemed_at: self.redeemed_at,
            verification_code: self.verification_code,
            status,
            metadata: self.metadata,
        })
    }
}

#[async_trait]
impl OfferStore for PostgresOfferStore {
    async fn get_offer(&self, id: Uuid) -> StoreResult<Option<Offer>> {
        let row: Option<OfferRow> =
            sqlx::query_as(&format!("SELECT {OFFER_COLUMNS} FROM offers WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_err)?;
        row.map(OfferRow::into_offer).transpose()
    }

    async fn count_user_redemptions(&self, offer_id: Uuid, user_id: Uuid) -> StoreResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM offer_redemptions \
             WHERE offer_id = $1 AND user_id = $2 AND status <> 'cancelled'",
        )
        .bind(offer_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn execute_redemption(
        &self,
        attempt: RedemptionAttempt,
    ) -> StoreResult<RedemptionOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        // Row lock on the offer serializes every concurrent attempt for it;
        // the eligibility re-check below therefore sees a settled used_count.
        let row: Option<OfferRow> = sqlx::query_as(&format!(
            "SELECT {OFFER_COLUMNS} FROM offers WHERE id = $1 FOR UPDATE"
        ))
        .bind(attempt.offer_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_err)?;

        let offer = match row {
            Some(row) => row.into_offer()?,
            None => return Err(StoreError::NotFound),
        };

        if let Some(reason) = offer.deny_reason(attempt.now) {
            // Dropping the transaction rolls it back.
            return Ok(RedemptionOutcome::Denied(reason));
        }

        if offer.usage_limit_per_user.is_some() {
            let prior: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM offer_redemptions \
                 WHERE offer_id = $1 AND user_id = $2 AND status <> 'cancelled'",
            )
            .bind(attempt.offer_id)
            .bind(attempt.user_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_err)?;
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

        sqlx::query(
            "INSERT INTO offer_redemptions \
             (id, offer_id, user_id, redeemed_at, verification_code, status, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(redemption.id)
        .bind(redemption.offer_id)
        .bind(redemption.user_id)
        .bind(redemption.redeemed_at)
        .bind(&redemption.verification_code)
        .bind(redemption.status.to_string())
        .bind(&redemption.metadata)
        .execute(&mut *tx)
        .await
        .map_err(map_err)?;

        sqlx::query("UPDATE offers SET used_count = used_count + 1 WHERE id = $1")
            .bind(attempt.offer_id)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;

        tx.commit().await.map_err(map_err)?;
        Ok(RedemptionOutcome::Recorded(redemption))
    }

    async fn create_offer(&self, offer: &Offer) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO offers \
             (id, business_id, venue_id, title, title_ar, description, description_ar, \
              start_date, end_date, usage_limit, usage_limit_per_user, used_count, \
              is_active, is_featured, status, created_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(offer.id)
        .bind(offer.business_id)
        .bind(offer.venue_id)
        .bind(&offer.title)
        .bind(&offer.title_ar)
        .bind(&offer.description)
        .bind(&offer.description_ar)
        .bind(offer.start_date)
        .bind(offer.end_date)
        .bind(offer.usage_limit)
        .bind(offer.usage_limit_per_user)
        .bind(offer.used_count)
        .bind(offer.is_active)
        .bind(offer.is_featured)
        .bind(offer.status.to_string())
        .bind(offer.created_at)
        .bind(offer.deleted_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn set_offer_status(&self, id: Uuid, status: OfferStatus) -> StoreResult<()> {
        let result = sqlx::query("UPDATE offers SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.to_string())
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn soft_delete_offer(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE offers SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(map_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn cancel_redemption(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE offer_redemptions SET status = 'cancelled' \
             WHERE id = $1 AND status <> 'cancelled'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_redemptions_for_offer(&self, offer_id: Uuid) -> StoreResult<Vec<Redemption>> {
        let rows: Vec<RedemptionRow> = sqlx::query_as(
            "SELECT id, offer_id, user_id, redeemed_at, verification_code, status, metadata \
             FROM offer_redemptions WHERE offer_id = $1 ORDER BY redeemed_at DESC",
        )
        .bind(offer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        rows.into_iter().map(RedemptionRow::into_redemption).collect()
    }
}
