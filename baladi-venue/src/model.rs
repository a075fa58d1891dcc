use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::geo::GeoPoint;

/// Moderation state of a venue listing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VenueStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for VenueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VenueStatus::Pending => "pending",
            VenueStatus::Approved => "approved",
            VenueStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

impl FromStr for VenueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(VenueStatus::Pending),
            "approved" => Ok(VenueStatus::Approved),
            "rejected" => Ok(VenueStatus::Rejected),
            other => Err(format!("unknown venue status: {other}")),
        }
    }
}

/// Price tier, rendered as $ .. $$$$ in the apps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PriceTier {
    #[serde(rename = "$")]
    Budget,
    #[serde(rename = "$$")]
    Moderate,
    #[serde(rename = "$$$")]
    Premium,
    #[serde(rename = "$$$$")]
    Luxury,
}

impl std::fmt::Display for PriceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PriceTier::Budget => "$",
            PriceTier::Moderate => "$$",
            PriceTier::Premium => "$$$",
            PriceTier::Luxury => "$$$$",
        };
        f.write_str(s)
    }
}

impl FromStr for PriceTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "$" => Ok(PriceTier::Budget),
            "$$" => Ok(PriceTier::Moderate),
            "$$$" => Ok(PriceTier::Premium),
            "$$$$" => Ok(PriceTier::Luxury),
            other => Err(format!("unknown price tier: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
    pub id: Uuid,
    pub business_id: Uuid,
    pub category_id: Uuid,
    pub subcategory_id: Option<Uuid>,
    pub name: String,
    pub name_ar: Option<String>,
    pub description: Option<String>,
    pub description_ar: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub location: Option<GeoPoint>,
    pub amenities: Vec<String>,
    pub price_tier: Option<PriceTier>,
    pub women_only: bool,
    pub is_featured: bool,
    pub is_active: bool,
    pub status: VenueStatus,
    pub average_rating: f64,
    pub total_reviews: i32,
    pub total_visits: i32,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Venue {
    /// Base discovery predicate: only active, approved, non-deleted venues
    /// ever appear in search results.
    pub fn is_listed(&self) -> bool {
        self.is_active && self.status == VenueStatus::Approved && self.deleted_at.is_none()
    }

    /// Case-insensitive free-text match against name and description,
    /// including the Arabic variants.
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [
            Some(self.name.as_str()),
            self.name_ar.as_deref(),
            self.description.as_deref(),
            self.description_ar.as_deref(),
        ]
        .iter()
        .flatten()
        .any(|h| h.to_lowercase().contains(&needle))
    }
}

/// Payload for creating a venue; the store stamps id, counters and timestamps.
#[derive(Debug, Clone, Deserialize)]
pub struct NewVenue {
    pub business_id: Uuid,
    pub category_id: Uuid,
    pub subcategory_id: Option<Uuid>,
    pub name: String,
    pub name_ar: Option<String>,
    pub description: Option<String>,
    pub description_ar: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub amenities: Option<Vec<String>>,
    pub price_tier: Option<PriceTier>,
    pub women_only: Option<bool>,
}

impl Venue {
    /// New venues start Pending and unlisted until a moderator approves them.
    pub fn create(new: NewVenue, now: DateTime<Utc>) -> Option<Self> {
        let location = match (new.latitude, new.longitude) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)?),
            (None, None) => None,
            // One coordinate without the other is malformed.
            _ => return None,
        };
        Some(Self {
            id: Uuid::new_v4(),
            business_id: new.business_id,
            category_id: new.category_id,
            subcategory_id: new.subcategory_id,
            name: new.name,
            name_ar: new.name_ar,
            description: new.description,
            description_ar: new.description_ar,
            city: new.city,
            region: new.region,
            location,
            amenities: new.amenities.unwrap_or_default(),
            price_tier: new.price_tier,
            women_only: new.women_only.unwrap_or(false),
            is_featured: false,
            is_active: true,
            status: VenueStatus::Pending,
            average_rating: 0.0,
            total_reviews: 0,
            total_visits: 0,
            created_at: now,
            deleted_at: None,
        })
    }
}

/// A recorded user visit; at most one per user per venue per UTC day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueVisit {
    pub id: Uuid,
    pub venue_id: Uuid,
    pub user_id: Uuid,
    pub visited_at: DateTime<Utc>,
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venue() -> Venue {
        Venue::create(
            NewVenue {
                business_id: Uuid::new_v4(),
                category_id: Uuid::new_v4(),
                subcategory_id: None,
                name: "Marina Breeze Lounge".to_string(),
                name_ar: Some("مارينا بريز".to_string()),
                description: Some("Rooftop lounge with skyline views".to_string()),
                description_ar: None,
                city: Some("Dubai".to_string()),
                region: Some("Dubai".to_string()),
                latitude: Some(25.08),
                longitude: Some(55.14),
                amenities: Some(vec!["wifi".to_string(), "parking".to_string()]),
                price_tier: Some(PriceTier::Premium),
                women_only: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn new_venues_are_not_listed_until_approved() {
        let mut v = venue();
        assert!(!v.is_listed());
        v.status = VenueStatus::Approved;
        assert!(v.is_listed());
        v.deleted_at = Some(Utc::now());
        assert!(!v.is_listed());
    }

    #[test]
    fn text_match_covers_arabic_variants() {
        let v = venue();
        assert!(v.matches_text("marina"));
        assert!(v.matches_text("SKYLINE"));
        assert!(v.matches_text("بريز"));
        assert!(!v.matches_text("karaoke"));
    }

    #[test]
    fn create_rejects_half_a_coordinate() {
        let mut new = NewVenue {
            business_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            subcategory_id: None,
            name: "No Place".to_string(),
            name_ar: None,
            description: None,
            description_ar: None,
            city: None,
            region: None,
            latitude: Some(25.0),
            longitude: None,
            amenities: None,
            price_tier: None,
            women_only: None,
        };
        assert!(Venue::create(new.clone(), Utc::now()).is_none());
        new.longitude = Some(55.0);
        assert!(Venue::create(new.clone(), Utc::now()).is_some());
        new.latitude = Some(95.0);
        assert!(Venue::create(new, Utc::now()).is_none());
    }
}
