use std::sync::Arc;
use tokio::sync::broadcast;

use baladi_core::clock::Clock;
use baladi_offer::eligibility::EligibilityEngine;
use baladi_offer::store::OfferStore;
use baladi_shared::models::events::OfferRedeemedEvent;
use baladi_store::RedisClient;
use baladi_venue::search::{SearchEngine, VenueStore};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub offers: Arc<dyn OfferStore>,
    pub venues: Arc<dyn VenueStore>,
    pub eligibility: Arc<EligibilityEngine>,
    pub search: Arc<SearchEngine>,
    pub clock: Arc<dyn Clock>,
    pub redis: Arc<RedisClient>,
    pub events_tx: broadcast::Sender<OfferRedeemedEvent>,
    pub auth: AuthConfig,
}
