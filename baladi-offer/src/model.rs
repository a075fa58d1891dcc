use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Moderation state of an offer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Approved => "approved",
            OfferStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

impl FromStr for OfferStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OfferStatus::Pending),
            "approved" => Ok(OfferStatus::Approved),
            "rejected" => Ok(OfferStatus::Rejected),
            other => Err(format!("unknown offer status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionStatus {
    Pending,
    Completed,
    Cancelled,
}

impl std::fmt::Display for RedemptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RedemptionStatus::Pending => "pending",
            RedemptionStatus::Completed => "completed",
            RedemptionStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for RedemptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RedemptionStatus::Pending),
            "completed" => Ok(RedemptionStatus::Completed),
            "cancelled" => Ok(RedemptionStatus::Cancelled),
            other => Err(format!("unknown redemption status: {other}")),
        }
    }
}

/// Why an offer cannot currently be redeemed, independent of the user.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    Deleted,
    Inactive,
    NotApproved,
    NotStarted,
    Expired,
    Exhausted,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::Deleted => "deleted",
            DenialReason::Inactive => "inactive",
            DenialReason::NotApproved => "not_approved",
            DenialReason::NotStarted => "not_started",
            DenialReason::Expired => "expired",
            DenialReason::Exhausted => "exhausted",
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub business_id: Uuid,
    pub venue_id: Option<Uuid>,
    pub title: String,
    pub title_ar: Option<String>,
    pub description: Option<String>,
    pub description_ar: Option<String>,
    pub start_date: DateTime<Utc>,
    /// Inclusive: an offer whose end_date equals "now" is still redeemable.
    pub end_date: DateTime<Utc>,
    /// None = unlimited, Some(0) = closed.
    pub usage_limit: Option<i32>,
    pub usage_limit_per_user: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
    pub is_featured: bool,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Offer {
    pub fn deny_reason(&self, now: DateTime<Utc>) -> Option<DenialReason> {
        if self.deleted_at.is_some() {
            return Some(DenialReason::Deleted);
        }
        if !self.is_active {
            return Some(DenialReason::Inactive);
        }
        if self.status != OfferStatus::Approved {
            return Some(DenialReason::NotApproved);
        }
        if now < self.start_date {
            return Some(DenialReason::NotStarted);
        }
        if now > self.end_date {
            return Some(DenialReason::Expired);
        }
        match self.usage_limit {
            Some(limit) if self.used_count >= limit => Some(DenialReason::Exhausted),
            _ => None,
        }
    }

    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.deny_reason(now).is_none()
    }

    /// Per-user cap against the user's prior non-cancelled redemptions.
    /// None means unlimited; Some(0) admits nobody.
    pub fn user_within_limit(&self, prior_redemptions: i64) -> bool {
        match self.usage_limit_per_user {
            Some(limit) => prior_redemptions < i64::from(limit),
            None => true,
        }
    }
}

/// Payload for creating an offer; the caller's store stamps the rest.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOffer {
    pub business_id: Uuid,
    pub venue_id: Option<Uuid>,
    pub title: String,
    pub title_ar: Option<String>,
    pub description: Option<String>,
    pub description_ar: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    pub usage_limit_per_user: Option<i32>,
}

impl Offer {
    /// New offers start Pending and unredeemable until a moderator approves
    /// them.
    pub fn create(new: NewOffer, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            business_id: new.business_id,
            venue_id: new.venue_id,
            title: new.title,
            title_ar: new.title_ar,
            description: new.description,
            description_ar: new.description_ar,
            start_date: new.start_date,
            end_date: new.end_date,
            usage_limit: new.usage_limit,
            usage_limit_per_user: new.usage_limit_per_user,
            used_count: 0,
            is_active: true,
            is_featured: false,
            status: OfferStatus::Pending,
            created_at: now,
            deleted_at: None,
        }
    }
}

/// A recorded instance of a user claiming an offer. Immutable once completed
/// except for the transition to cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Redemption {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub user_id: Uuid,
    pub redeemed_at: DateTime<Utc>,
    pub verification_code: String,
    pub status: RedemptionStatus,
    pub metadata: serde_json::Value,
}
