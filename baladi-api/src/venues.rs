use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use baladi_core::clock::Clock;
use baladi_core::page::Page;
use baladi_venue::filters::{LocationFilter, SortBy, VenueFilters};
use baladi_venue::model::{Venue, VenueVisit};
use baladi_venue::search::VenueHit;

use crate::error::AppError;
use crate::middleware::auth::{customer_auth_middleware, CustomerClaims};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchVenuesQuery {
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub price_tier: Option<String>,
    /// Comma-separated list; a venue must carry every listed amenity.
    pub amenities: Option<String>,
    pub women_only: Option<bool>,
    pub featured: Option<bool>,
    pub min_rating: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<f64>,
    pub sort_by: Option<SortBy>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl SearchVenuesQuery {
    fn into_filters(self) -> Result<VenueFilters, AppError> {
        let location = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(LocationFilter {
                latitude,
                longitude,
                radius_km: self.radius,
            }),
            (None, None) => None,
            _ => {
                return Err(AppError::Validation(
                    "latitude and longitude must be provided together".to_string(),
                ))
            }
        };
        let price_tier = self
            .price_tier
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(AppError::Validation)?;
        let amenities = self
            .amenities
            .as_deref()
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(VenueFilters {
            search: self.search,
            category_id: self.category_id,
            subcategory_id: self.subcategory_id,
            region: self.region,
            city: self.city,
            price_tier,
            amenities,
            women_only: self.women_only,
            featured: self.featured,
            min_rating: self.min_rating,
            location,
            sort: self.sort_by.unwrap_or_default(),
            page: self.page,
            per_page: self.per_page,
        })
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct VisitRequest {
    pub source: Option<String>,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes(state: &AppState) -> Router<AppState> {
    let authed = Router::new()
        .route("/v1/venues/{id}/visit", post(record_visit))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            customer_auth_middleware,
        ));

    Router::new()
        .route("/v1/venues/search", get(search_venues))
        .route("/v1/venues/{id}", get(get_venue))
        .merge(authed)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1/venues/search
/// Filtered, geo-ranked, paginated venue discovery.
pub async fn search_venues(
    State(state): State<AppState>,
    Query(query): Query<SearchVenuesQuery>,
) -> Result<Json<Page<VenueHit>>, AppError> {
    let filters = query.into_filters()?;
    let page = state.search.search(&filters).await?;
    Ok(Json(page))
}

/// GET /v1/venues/{id}
pub async fn get_venue(
    State(state): State<AppState>,
    Path(venue_id): Path<Uuid>,
) -> Result<Json<Venue>, AppError> {
    let venue = state
        .venues
        .get_venue(venue_id)
        .await?
        .filter(Venue::is_listed)
        .ok_or_else(|| AppError::NotFound("venue not found".to_string()))?;
    Ok(Json(venue))
}

/// POST /v1/venues/{id}/visit
/// Records at most one visit per user per venue per UTC day.
pub async fn record_visit(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(venue_id): Path<Uuid>,
    Json(req): Json<VisitRequest>,
) -> Result<(StatusCode, Json<VenueVisit>), AppError> {
    let user_id = parse_user_id(&claims)?;
    let source = req.source.as_deref().unwrap_or("app");

    let visit = state
        .venues
        .record_visit(venue_id, user_id, state.clock.now(), source)
        .await?;
    Ok((StatusCode::CREATED, Json(visit)))
}

pub(crate) fn parse_user_id(claims: &CustomerClaims) -> Result<Uuid, AppError> {
    claims
        .sub
        .parse()
        .map_err(|_| AppError::Unauthorized("token subject is not a valid user id".to_string()))
}
