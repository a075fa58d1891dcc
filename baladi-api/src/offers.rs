use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use baladi_core::clock::Clock;
use baladi_core::identity::RequestContext;
use baladi_offer::model::{Offer, Redemption, RedemptionStatus};
use baladi_shared::models::events::OfferRedeemedEvent;
use baladi_shared::pii::Masked;

use crate::error::AppError;
use crate::middleware::auth::{customer_auth_middleware, CustomerClaims};
use crate::state::AppState;
use crate::venues::parse_user_id;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct OfferResponse {
    pub id: Uuid,
    pub business_id: Uuid,
    pub venue_id: Option<Uuid>,
    pub title: String,
    pub title_ar: Option<String>,
    pub description: Option<String>,
    pub description_ar: Option<String>,
    pub start_date: chrono::DateTime<chrono::Utc>,
    pub end_date: chrono::DateTime<chrono::Utc>,
    pub usage_limit: Option<i32>,
    pub usage_limit_per_user: Option<i32>,
    pub used_count: i32,
    pub is_featured: bool,
    pub status: String,
    pub is_redeemable: bool,
}

impl OfferResponse {
    fn from_offer(offer: Offer, is_redeemable: bool) -> Self {
        Self {
            id: offer.id,
            business_id: offer.business_id,
            venue_id: offer.venue_id,
            title: offer.title,
            title_ar: offer.title_ar,
            description: offer.description,
            description_ar: offer.description_ar,
            start_date: offer.start_date,
            end_date: offer.end_date,
            usage_limit: offer.usage_limit,
            usage_limit_per_user: offer.usage_limit_per_user,
            used_count: offer.used_count,
            is_featured: offer.is_featured,
            status: offer.status.to_string(),
            is_redeemable,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EligibilityResponse {
    pub can_redeem: bool,
}

#[derive(Debug, Serialize)]
pub struct RedemptionResponse {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub verification_code: String,
    pub redeemed_at: chrono::DateTime<chrono::Utc>,
    pub status: RedemptionStatus,
}

impl From<Redemption> for RedemptionResponse {
    fn from(r: Redemption) -> Self {
        Self {
            id: r.id,
            offer_id: r.offer_id,
            verification_code: r.verification_code,
            redeemed_at: r.redeemed_at,
            status: r.status,
        }
    }
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes(state: &AppState) -> Router<AppState> {
    let authed = Router::new()
        .route("/v1/offers/{id}/eligibility", get(check_eligibility))
        .route("/v1/offers/{id}/redeem", post(redeem_offer))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            customer_auth_middleware,
        ));

    Router::new()
        .route("/v1/offers/{id}", get(get_offer))
        .merge(authed)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1/offers/{id}
pub async fn get_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<Uuid>,
) -> Result<Json<OfferResponse>, AppError> {
    let offer = state
        .offers
        .get_offer(offer_id)
        .await?
        .filter(|o| o.deleted_at.is_none())
        .ok_or_else(|| AppError::NotFound("offer not found".to_string()))?;

    let is_redeemable = offer.is_redeemable(state.clock.now());
    Ok(Json(OfferResponse::from_offer(offer, is_redeemable)))
}

/// GET /v1/offers/{id}/eligibility
/// Advisory check; the redeem endpoint re-validates transactionally.
pub async fn check_eligibility(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(offer_id): Path<Uuid>,
) -> Result<Json<EligibilityResponse>, AppError> {
    let user_id = parse_user_id(&claims)?;
    let can_redeem = state.eligibility.can_user_redeem(offer_id, user_id).await?;
    Ok(Json(EligibilityResponse { can_redeem }))
}

/// POST /v1/offers/{id}/redeem
pub async fn redeem_offer(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(offer_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<RedemptionResponse>), AppError> {
    let user_id = parse_user_id(&claims)?;
    let ctx = request_context(&headers);

    let redemption = state.eligibility.redeem(offer_id, user_id, &ctx).await?;

    // Best effort; nobody listening is fine.
    let _ = state.events_tx.send(OfferRedeemedEvent {
        redemption_id: redemption.id,
        offer_id: redemption.offer_id,
        user_id: redemption.user_id,
        timestamp: redemption.redeemed_at.timestamp(),
    });

    Ok((StatusCode::CREATED, Json(redemption.into())))
}

fn request_context(headers: &HeaderMap) -> RequestContext {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| Masked(ip.trim().to_string()));
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    RequestContext {
        ip_address,
        user_agent,
        source: Some("api".to_string()),
    }
}
