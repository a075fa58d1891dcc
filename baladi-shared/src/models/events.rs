use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OfferRedeemedEvent {
    pub redemption_id: Uuid,
    pub offer_id: Uuid,
    pub user_id: Uuid,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OfferModeratedEvent {
    pub offer_id: Uuid,
    pub status: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct VenueVisitedEvent {
    pub venue_id: Uuid,
    pub user_id: Uuid,
    pub timestamp: i64,
}
