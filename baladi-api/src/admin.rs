use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use uuid::Uuid;

use baladi_core::clock::Clock;
use baladi_offer::model::{NewOffer, Offer, OfferStatus};
use baladi_venue::model::{NewVenue, Venue, VenueStatus};

use crate::error::AppError;
use crate::middleware::auth::admin_auth_middleware;
use crate::state::AppState;

// ============================================================================
// Routes
// ============================================================================

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/admin/offers", post(create_offer))
        .route("/v1/admin/offers/{id}/approve", post(approve_offer))
        .route("/v1/admin/offers/{id}/reject", post(reject_offer))
        .route("/v1/admin/offers/{id}", delete(delete_offer))
        .route("/v1/admin/venues", post(create_venue))
        .route("/v1/admin/venues/{id}/approve", post(approve_venue))
        .route("/v1/admin/venues/{id}/reject", post(reject_venue))
        .route("/v1/admin/venues/{id}", delete(delete_venue))
        .route("/v1/admin/redemptions/{id}/cancel", post(cancel_redemption))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
}

// ============================================================================
// Offer moderation
// ============================================================================

/// POST /v1/admin/offers
/// Offers are created pending and stay unredeemable until approved.
pub async fn create_offer(
    State(state): State<AppState>,
    Json(new): Json<NewOffer>,
) -> Result<(StatusCode, Json<Offer>), AppError> {
    if new.end_date < new.start_date {
        return Err(AppError::Validation(
            "end_date must not precede start_date".to_string(),
        ));
    }
    if new.usage_limit.is_some_and(|l| l < 0) || new.usage_limit_per_user.is_some_and(|l| l < 0) {
        return Err(AppError::Validation(
            "usage limits must be non-negative".to_string(),
        ));
    }

    let offer = Offer::create(new, state.clock.now());
    state.offers.create_offer(&offer).await?;
    Ok((StatusCode::CREATED, Json(offer)))
}

/// POST /v1/admin/offers/{id}/approve
pub async fn approve_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .offers
        .set_offer_status(offer_id, OfferStatus::Approved)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/admin/offers/{id}/reject
pub async fn reject_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .offers
        .set_offer_status(offer_id, OfferStatus::Rejected)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /v1/admin/offers/{id}
/// Soft delete: the row stays for audit, the offer disappears everywhere.
pub async fn delete_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .offers
        .soft_delete_offer(offer_id, state.clock.now())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Venue moderation
// ============================================================================

/// POST /v1/admin/venues
pub async fn create_venue(
    State(state): State<AppState>,
    Json(new): Json<NewVenue>,
) -> Result<(StatusCode, Json<Venue>), AppError> {
    let venue = Venue::create(new, state.clock.now()).ok_or_else(|| {
        AppError::Validation("coordinates must be a valid pair or absent".to_string())
    })?;
    state.venues.create_venue(&venue).await?;
    Ok((StatusCode::CREATED, Json(venue)))
}

/// POST /v1/admin/venues/{id}/approve
pub async fn approve_venue(
    State(state): State<AppState>,
    Path(venue_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .venues
        .set_venue_status(venue_id, VenueStatus::Approved)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/admin/venues/{id}/reject
pub async fn reject_venue(
    State(state): State<AppState>,
    Path(venue_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .venues
        .set_venue_status(venue_id, VenueStatus::Rejected)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /v1/admin/venues/{id}
pub async fn delete_venue(
    State(state): State<AppState>,
    Path(venue_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .venues
        .soft_delete_venue(venue_id, state.clock.now())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Redemption support
// ============================================================================

/// POST /v1/admin/redemptions/{id}/cancel
/// Frees the user's per-user slot; used_count is never decremented.
pub async fn cancel_redemption(
    State(state): State<AppState>,
    Path(redemption_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.offers.cancel_redemption(redemption_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
