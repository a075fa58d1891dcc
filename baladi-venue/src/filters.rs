use serde::Deserialize;
use uuid::Uuid;

use baladi_core::page::{PageRequest, DEFAULT_PAGE_SIZE};
use baladi_core::StoreError;

use crate::geo::GeoPoint;
use crate::model::{PriceTier, Venue};

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("invalid search filter: {0}")]
    InvalidFilter(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Venue orderings selectable by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Relevance,
    Rating,
    Reviews,
    Visits,
    Newest,
    Distance,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LocationFilter {
    pub latitude: f64,
    pub longitude: f64,
    /// Defaults to SearchLimits::default_radius_km when absent.
    pub radius_km: Option<f64>,
}

/// Operational bounds for search, supplied from configuration.
#[derive(Debug, Clone, Copy)]
pub struct SearchLimits {
    pub default_radius_km: f64,
    pub max_radius_km: f64,
    pub max_page_size: u32,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            default_radius_km: 10.0,
            max_radius_km: 50.0,
            max_page_size: 50,
        }
    }
}

/// All filters are optional and AND-combined.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VenueFilters {
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub price_tier: Option<PriceTier>,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub women_only: Option<bool>,
    pub featured: Option<bool>,
    pub min_rating: Option<f64>,
    pub location: Option<LocationFilter>,
    #[serde(default)]
    pub sort: SortBy,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl VenueFilters {
    pub fn validate(&self, limits: &SearchLimits) -> Result<(), SearchError> {
        if let Some(loc) = &self.location {
            if GeoPoint::new(loc.latitude, loc.longitude).is_none() {
                return Err(SearchError::InvalidFilter(format!(
                    "coordinates out of range: ({}, {})",
                    loc.latitude, loc.longitude
                )));
            }
            let radius = loc.radius_km.unwrap_or(limits.default_radius_km);
            if !(1.0..=limits.max_radius_km).contains(&radius) {
                return Err(SearchError::InvalidFilter(format!(
                    "radius must be between 1 and {} km",
                    limits.max_radius_km
                )));
            }
        }
        if let Some(rating) = self.min_rating {
            if !(1.0..=5.0).contains(&rating) {
                return Err(SearchError::InvalidFilter(
                    "min_rating must be between 1 and 5".to_string(),
                ));
            }
        }
        if let Some(page) = self.page {
            if page == 0 {
                return Err(SearchError::InvalidFilter(
                    "page numbering starts at 1".to_string(),
                ));
            }
        }
        if let Some(per_page) = self.per_page {
            if per_page == 0 || per_page > limits.max_page_size {
                return Err(SearchError::InvalidFilter(format!(
                    "per_page must be between 1 and {}",
                    limits.max_page_size
                )));
            }
        }
        Ok(())
    }

    /// The query point and effective radius, once validated.
    pub fn resolved_location(&self, limits: &SearchLimits) -> Option<(GeoPoint, f64)> {
        let loc = self.location.as_ref()?;
        let point = GeoPoint::new(loc.latitude, loc.longitude)?;
        Some((point, loc.radius_km.unwrap_or(limits.default_radius_km)))
    }

    pub fn page_request(&self, limits: &SearchLimits) -> PageRequest {
        let per_page = self
            .per_page
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(limits.max_page_size);
        PageRequest::new(self.page.unwrap_or(1), per_page)
    }

    /// Non-geographic predicates, applied identically by the engine and the
    /// in-memory store.
    pub fn matches(&self, venue: &Venue) -> bool {
        if let Some(text) = &self.search {
            if !venue.matches_text(text) {
                return false;
            }
        }
        if let Some(id) = self.category_id {
            if venue.category_id != id {
                return false;
            }
        }
        if let Some(id) = self.subcategory_id {
            if venue.subcategory_id != Some(id) {
                return false;
            }
        }
        if let Some(region) = &self.region {
            if venue
                .region
                .as_deref()
                .is_none_or(|r| !r.eq_ignore_ascii_case(region))
            {
                return false;
            }
        }
        if let Some(city) = &self.city {
            if venue
                .city
                .as_deref()
                .is_none_or(|c| !c.eq_ignore_ascii_case(city))
            {
                return false;
            }
        }
        if let Some(tier) = self.price_tier {
            if venue.price_tier != Some(tier) {
                return false;
            }
        }
        if !self
            .amenities
            .iter()
            .all(|a| venue.amenities.iter().any(|v| v == a))
        {
            return false;
        }
        if let Some(women_only) = self.women_only {
            if venue.women_only != women_only {
                return false;
            }
        }
        if let Some(featured) = self.featured {
            if venue.is_featured != featured {
                return false;
            }
        }
        if let Some(min_rating) = self.min_rating {
            if venue.average_rating < min_rating {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> SearchLimits {
        SearchLimits::default()
    }

    #[test]
    fn default_filters_validate() {
        assert!(VenueFilters::default().validate(&limits()).is_ok());
    }

    #[test]
    fn rejects_bad_coordinates_and_radius() {
        let mut f = VenueFilters {
            location: Some(LocationFilter {
                latitude: 91.0,
                longitude: 55.0,
                radius_km: None,
            }),
            ..Default::default()
        };
        assert!(matches!(
            f.validate(&limits()),
            Err(SearchError::InvalidFilter(_))
        ));

        f.location = Some(LocationFilter {
            latitude: 25.0,
            longitude: 55.0,
            radius_km: Some(0.5),
        });
        assert!(f.validate(&limits()).is_err());

        f.location = Some(LocationFilter {
            latitude: 25.0,
            longitude: 55.0,
            radius_km: Some(51.0),
        });
        assert!(f.validate(&limits()).is_err());

        f.location = Some(LocationFilter {
            latitude: 25.0,
            longitude: 55.0,
            radius_km: Some(50.0),
        });
        assert!(f.validate(&limits()).is_ok());
    }

    #[test]
    fn rejects_rating_and_pagination_out_of_bounds() {
        let f = VenueFilters {
            min_rating: Some(5.5),
            ..Default::default()
        };
        assert!(f.validate(&limits()).is_err());

        let f = VenueFilters {
            page: Some(0),
            ..Default::default()
        };
        assert!(f.validate(&limits()).is_err());

        let f = VenueFilters {
            per_page: Some(51),
            ..Default::default()
        };
        assert!(f.validate(&limits()).is_err());
    }

    #[test]
    fn missing_radius_falls_back_to_default() {
        let f = VenueFilters {
            location: Some(LocationFilter {
                latitude: 25.0,
                longitude: 55.0,
                radius_km: None,
            }),
            ..Default::default()
        };
        let (_, radius) = f.resolved_location(&limits()).unwrap();
        assert_eq!(radius, 10.0);
    }

    #[test]
    fn per_page_is_clamped_to_the_cap() {
        let f = VenueFilters::default();
        let req = f.page_request(&limits());
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, 20);
    }
}
