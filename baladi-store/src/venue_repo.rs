use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use baladi_core::{StoreError, StoreResult};
use baladi_venue::filters::VenueFilters;
use baladi_venue::geo::GeoPoint;
use baladi_venue::model::{PriceTier, Venue, VenueStatus, VenueVisit};
use baladi_venue::search::VenueStore;

use crate::database::map_err;

pub struct PostgresVenueStore {
    pool: PgPool,
}

impl PostgresVenueStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const VENUE_COLUMNS: &str = "id, business_id, category_id, subcategory_id, name, name_ar, \
     description, description_ar, city, region, latitude, longitude, amenities, price_tier, \
     women_only, is_featured, is_active, status, average_rating, total_reviews, total_visits, \
     created_at, deleted_at";

#[derive(sqlx::FromRow)]
struct VenueRow {
    id: Uuid,
    business_id: Uuid,
    category_id: Uuid,
    subcategory_id: Option<Uuid>,
    name: String,
    name_ar: Option<String>,
    description: Option<String>,
    description_ar: Option<String>,
    city: Option<String>,
    region: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    amenities: serde_json::Value,
    price_tier: Option<String>,
    women_only: bool,
    is_featured: bool,
    is_active: bool,
    status: String,
    average_rating: f64,
    total_reviews: i32,
    total_visits: i32,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl VenueRow {
    fn into_venue(self) -> StoreResult<Venue> {
        let status: VenueStatus = self.status.parse().map_err(StoreError::Backend)?;
        let price_tier: Option<PriceTier> = self
            .price_tier
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(StoreError::Backend)?;
        let location = match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => GeoPoint::new(lat, lng),
            _ => None,
        };
        Ok(Venue {
            id: self.id,
            business_id: self.business_id,
            category_id: self.category_id,
            subcategory_id: self.subcategory_id,
            name: self.name,
            name_ar: self.name_ar,
            description: self.description,
            description_ar: self.description_ar,
            city: self.city,
            region: self.region,
            location,
            amenities: serde_json::from_value(self.amenities).unwrap_or_default(),
            price_tier,
            women_only: self.women_only,
            is_featured: self.is_featured,
            is_active: self.is_active,
            status,
            average_rating: self.average_rating,
            total_reviews: self.total_reviews,
            total_visits: self.total_visits,
            created_at: self.created_at,
            deleted_at: self.deleted_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct VisitRow {
    id: Uuid,
    venue_id: Uuid,
    user_id: Uuid,
    visited_at: DateTime<Utc>,
    source: String,
}

impl From<VisitRow> for VenueVisit {
    fn from(row: VisitRow) -> Self {
        VenueVisit {
            id: row.id,
            venue_id: row.venue_id,
            user_id: row.user_id,
            visited_at: row.visited_at,
            source: row.source,
        }
    }
}

#[async_trait]
impl VenueStore for PostgresVenueStore {
    async fn get_venue(&self, id: Uuid) -> StoreResult<Option<Venue>> {
        let row: Option<VenueRow> =
            sqlx::query_as(&format!("SELECT {VENUE_COLUMNS} FROM venues WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_err)?;
        row.map(VenueRow::into_venue).transpose()
    }

    /// Pushes the base predicate and the cheap equality filters down to SQL;
    /// text, amenity and geo filtering stay with the engine.
    async fn fetch_candidates(&self, filters: &VenueFilters) -> StoreResult<Vec<Venue>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {VENUE_COLUMNS} FROM venues \
             WHERE is_active = TRUE AND status = 'approved' AND deleted_at IS NULL"
        ));

        if let Some(id) = filters.category_id {
            qb.push(" AND category_id = ").push_bind(id);
        }
        if let Some(id) = filters.subcategory_id {
            qb.push(" AND subcategory_id = ").push_bind(id);
        }
        if let Some(region) = &filters.region {
            qb.push(" AND region ILIKE ").push_bind(region.clone());
        }
        if let Some(city) = &filters.city {
            qb.push(" AND city ILIKE ").push_bind(city.clone());
        }
        if let Some(tier) = filters.price_tier {
            qb.push(" AND price_tier = ").push_bind(tier.to_string());
        }
        if let Some(women_only) = filters.women_only {
            qb.push(" AND women_only = ").push_bind(women_only);
        }
        if let Some(featured) = filters.featured {
            qb.push(" AND is_featured = ").push_bind(featured);
        }
        if let Some(min_rating) = filters.min_rating {
            qb.push(" AND average_rating >= ").push_bind(min_rating);
        }

        let rows: Vec<VenueRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?;
        rows.into_iter().map(VenueRow::into_venue).collect()
    }

    async fn create_venue(&self, venue: &Venue) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO venues \
             (id, business_id, category_id, subcategory_id, name, name_ar, description, \
              description_ar, city, region, latitude, longitude, amenities, price_tier, \
              women_only, is_featured, is_active, status, average_rating, total_reviews, \
              total_visits, created_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
              $17, $18, $19, $20, $21, $22, $23)",
        )
        .bind(venue.id)
        .bind(venue.business_id)
        .bind(venue.category_id)
        .bind(venue.subcategory_id)
        .bind(&venue.name)
        .bind(&venue.name_ar)
        .bind(&venue.description)
        .bind(&venue.description_ar)
        .bind(&venue.city)
        .bind(&venue.region)
        .bind(venue.location.map(|p| p.latitude))
        .bind(venue.location.map(|p| p.longitude))
        .bind(serde_json::json!(venue.amenities))
        .bind(venue.price_tier.map(|t| t.to_string()))
        .bind(venue.women_only)
        .bind(venue.is_featured)
        .bind(venue.is_active)
        .bind(venue.status.to_string())
        .bind(venue.average_rating)
        .bind(venue.total_reviews)
        .bind(venue.total_visits)
        .bind(venue.created_at)
        .bind(venue.deleted_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn set_venue_status(&self, id: Uuid, status: VenueStatus) -> StoreResult<()> {
        let result = sqlx::query("UPDATE venues SET status = $2 WHERE id = $1")
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

    async fn soft_delete_venue(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE venues SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL")
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

    async fn record_visit(
        &self,
        venue_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
        source: &str,
    ) -> StoreResult<VenueVisit> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        let existing: Option<VisitRow> = sqlx::query_as(
            "SELECT id, venue_id, user_id, visited_at, source FROM venue_visits \
             WHERE venue_id = $1 AND user_id = $2 AND visit_date = $3",
        )
        .bind(venue_id)
        .bind(user_id)
        .bind(now.date_naive())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_err)?;

        if let Some(row) = existing {
            return Ok(row.into());
        }

        let visit = VenueVisit {
            id: Uuid::new_v4(),
            venue_id,
            user_id,
            visited_at: now,
            source: source.to_string(),
        };

        // The unique (venue_id, user_id, visit_date) index turns a racing
        // duplicate into a Conflict instead of a double count.
        sqlx::query(
            "INSERT INTO venue_visits (id, venue_id, user_id, visited_at, visit_date, source) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(visit.id)
        .bind(visit.venue_id)
        .bind(visit.user_id)
        .bind(visit.visited_at)
        .bind(now.date_naive())
        .bind(&visit.source)
        .execute(&mut *tx)
        .await
        .map_err(map_err)?;

        let result = sqlx::query("UPDATE venues SET total_visits = total_visits + 1 WHERE id = $1")
            .bind(venue_id)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        tx.commit().await.map_err(map_err)?;
        Ok(visit)
    }
}
