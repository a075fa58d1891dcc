pub mod code;
pub mod eligibility;
pub mod model;
pub mod store;

pub use eligibility::{EligibilityConfig, EligibilityEngine, RedeemError};
pub use model::{DenialReason, NewOffer, Offer, OfferStatus, Redemption, RedemptionStatus};
pub use store::{OfferStore, RedemptionAttempt, RedemptionOutcome};
