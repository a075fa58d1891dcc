use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use baladi_core::page::Page;
use baladi_core::StoreResult;

use crate::filters::{SearchError, SearchLimits, SortBy, VenueFilters};
use crate::geo::haversine_km;
use crate::model::{Venue, VenueStatus, VenueVisit};

/// Repository trait for venue data access.
#[async_trait]
pub trait VenueStore: Send + Sync {
    async fn get_venue(&self, id: Uuid) -> StoreResult<Option<Venue>>;

    /// Candidate venues for a search. Implementations always apply the base
    /// predicate (active, approved, not deleted) and may additionally
    /// prefilter on the cheap equality criteria; the engine re-applies every
    /// non-geographic predicate before ranking.
    async fn fetch_candidates(&self, filters: &VenueFilters) -> StoreResult<Vec<Venue>>;

    async fn create_venue(&self, venue: &Venue) -> StoreResult<()>;

    async fn set_venue_status(&self, id: Uuid, status: VenueStatus) -> StoreResult<()>;

    async fn soft_delete_venue(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<()>;

    /// Records a visit and bumps the venue counter in one transaction, unless
    /// the user already visited this venue on the same UTC day; the duplicate
    /// case returns the existing row untouched.
    async fn record_visit(
        &self,
        venue_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
        source: &str,
    ) -> StoreResult<VenueVisit>;
}

/// A venue hit, annotated with its distance from the query point when a
/// location filter was supplied.
#[derive(Debug, Clone, Serialize)]
pub struct VenueHit {
    #[serde(flatten)]
    pub venue: Venue,
    pub distance_km: Option<f64>,
}

/// Filters, ranks and paginates venues for the discovery endpoint.
pub struct SearchEngine {
    store: Arc<dyn VenueStore>,
    limits: SearchLimits,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn VenueStore>, limits: SearchLimits) -> Self {
        Self { store, limits }
    }

    pub fn limits(&self) -> &SearchLimits {
        &self.limits
    }

    /// Either a fully valid page or an error, never a partial result.
    pub async fn search(&self, filters: &VenueFilters) -> Result<Page<VenueHit>, SearchError> {
        filters.validate(&self.limits)?;

        let candidates = self.store.fetch_candidates(filters).await?;
        let location = filters.resolved_location(&self.limits);

        let mut hits: Vec<VenueHit> = candidates
            .into_iter()
            .filter(|v| v.is_listed() && filters.matches(v))
            .filter_map(|venue| match location {
                Some((origin, radius_km)) => {
                    // Venues without coordinates can never satisfy a location
                    // filter.
                    let point = venue.location?;
                    let distance = haversine_km(origin, point);
                    (distance < radius_km).then(|| VenueHit {
                        venue,
                        distance_km: Some(distance),
                    })
                }
                None => Some(VenueHit {
                    venue,
                    distance_km: None,
                }),
            })
            .collect();

        sort_hits(&mut hits, filters.sort, location.is_some());

        Ok(Page::from_items(hits, filters.page_request(&self.limits)))
    }
}

fn sort_hits(hits: &mut [VenueHit], sort: SortBy, has_location: bool) {
    match sort {
        // Fixed three-key tie-break; no scoring formula.
        SortBy::Relevance => hits.sort_by(|a, b| {
            b.venue
                .is_featured
                .cmp(&a.venue.is_featured)
                .then(b.venue.average_rating.total_cmp(&a.venue.average_rating))
                .then(b.venue.total_reviews.cmp(&a.venue.total_reviews))
        }),
        SortBy::Rating => {
            hits.sort_by(|a, b| b.venue.average_rating.total_cmp(&a.venue.average_rating))
        }
        SortBy::Reviews => hits.sort_by(|a, b| b.venue.total_reviews.cmp(&a.venue.total_reviews)),
        SortBy::Visits => hits.sort_by(|a, b| b.venue.total_visits.cmp(&a.venue.total_visits)),
        SortBy::Distance if has_location => hits.sort_by(|a, b| {
            a.distance_km
                .unwrap_or(f64::INFINITY)
                .total_cmp(&b.distance_km.unwrap_or(f64::INFINITY))
        }),
        // Distance without a location filter degrades to newest-first.
        SortBy::Newest | SortBy::Distance => {
            hits.sort_by(|a, b| b.venue.created_at.cmp(&a.venue.created_at))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::LocationFilter;
    use crate::geo::GeoPoint;
    use std::sync::Mutex;

    struct FixtureStore {
        venues: Mutex<Vec<Venue>>,
    }

    #[async_trait]
    impl VenueStore for FixtureStore {
        async fn get_venue(&self, id: Uuid) -> StoreResult<Option<Venue>> {
            Ok(self.venues.lock().unwrap().iter().find(|v| v.id == id).cloned())
        }

        async fn fetch_candidates(&self, _filters: &VenueFilters) -> StoreResult<Vec<Venue>> {
            Ok(self.venues.lock().unwrap().clone())
        }

        async fn create_venue(&self, venue: &Venue) -> StoreResult<()> {
            self.venues.lock().unwrap().push(venue.clone());
            Ok(())
        }

        async fn set_venue_status(&self, _id: Uuid, _status: VenueStatus) -> StoreResult<()> {
            unimplemented!("not exercised here")
        }

        async fn soft_delete_venue(&self, _id: Uuid, _now: DateTime<Utc>) -> StoreResult<()> {
            unimplemented!("not exercised here")
        }

        async fn record_visit(
            &self,
            _venue_id: Uuid,
            _user_id: Uuid,
            _now: DateTime<Utc>,
            _source: &str,
        ) -> StoreResult<VenueVisit> {
            unimplemented!("not exercised here")
        }
    }

    fn venue(name: &str, lat: f64, lng: f64) -> Venue {
        Venue {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            subcategory_id: None,
            name: name.to_string(),
            name_ar: None,
            description: None,
            description_ar: None,
            city: None,
            region: None,
            location: GeoPoint::new(lat, lng),
            amenities: Vec::new(),
            price_tier: None,
            women_only: false,
            is_featured: false,
            is_active: true,
            status: VenueStatus::Approved,
            average_rating: 0.0,
            total_reviews: 0,
            total_visits: 0,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn engine(venues: Vec<Venue>) -> SearchEngine {
        SearchEngine::new(
            Arc::new(FixtureStore {
                venues: Mutex::new(venues),
            }),
            SearchLimits::default(),
        )
    }

    #[tokio::test]
    async fn radius_filter_is_strict() {
        // Query point in central Dubai; one venue on the spot, one ~120km away.
        let here = venue("Here", 25.2048, 55.2708);
        let far = venue("Abu Dhabi Corniche", 24.4539, 54.3773);
        let engine = engine(vec![here.clone(), far]);

        let filters = VenueFilters {
            location: Some(LocationFilter {
                latitude: 25.2048,
                longitude: 55.2708,
                radius_km: Some(1.0),
            }),
            ..Default::default()
        };
        let page = engine.search(&filters).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].venue.id, here.id);
        assert!(page.items[0].distance_km.unwrap() < 1.0);
    }

    #[tokio::test]
    async fn venues_without_coordinates_are_excluded_from_location_search() {
        let mut homeless = venue("Nowhere", 0.0, 0.0);
        homeless.location = None;
        let engine = engine(vec![homeless]);

        let filters = VenueFilters {
            location: Some(LocationFilter {
                latitude: 25.0,
                longitude: 55.0,
                radius_km: Some(50.0),
            }),
            ..Default::default()
        };
        let page = engine.search(&filters).await.unwrap();
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn relevance_breaks_ties_by_review_count() {
        let mut a = venue("A", 25.0, 55.0);
        a.average_rating = 4.5;
        a.total_reviews = 10;
        let mut b = venue("B", 25.0, 55.0);
        b.average_rating = 4.5;
        b.total_reviews = 200;
        let mut featured = venue("C", 25.0, 55.0);
        featured.is_featured = true;
        featured.average_rating = 3.0;

        let engine = engine(vec![a.clone(), b.clone(), featured.clone()]);
        let page = engine.search(&VenueFilters::default()).await.unwrap();
        let names: Vec<_> = page.items.iter().map(|h| h.venue.name.as_str()).collect();
        // Featured first regardless of rating, then rating ties broken by reviews.
        assert_eq!(names, vec!["C", "B", "A"]);
    }

    #[tokio::test]
    async fn distance_sort_orders_ascending() {
        let near = venue("Near", 25.21, 55.27);
        let nearer = venue("Nearer", 25.2048, 55.2708);
        let engine = engine(vec![near, nearer]);

        let filters = VenueFilters {
            location: Some(LocationFilter {
                latitude: 25.2048,
                longitude: 55.2708,
                radius_km: Some(25.0),
            }),
            sort: SortBy::Distance,
            ..Default::default()
        };
        let page = engine.search(&filters).await.unwrap();
        let names: Vec<_> = page.items.iter().map(|h| h.venue.name.as_str()).collect();
        assert_eq!(names, vec!["Nearer", "Near"]);
    }

    #[tokio::test]
    async fn distance_sort_without_location_falls_back_to_newest() {
        let mut old = venue("Old", 25.0, 55.0);
        old.created_at = Utc::now() - chrono::Duration::days(30);
        let fresh = venue("Fresh", 25.0, 55.0);
        let engine = engine(vec![old, fresh]);

        let filters = VenueFilters {
            sort: SortBy::Distance,
            ..Default::default()
        };
        let page = engine.search(&filters).await.unwrap();
        assert_eq!(page.items[0].venue.name, "Fresh");
    }

    #[tokio::test]
    async fn unlisted_venues_never_surface() {
        let mut pending = venue("Pending", 25.0, 55.0);
        pending.status = VenueStatus::Pending;
        let mut inactive = venue("Inactive", 25.0, 55.0);
        inactive.is_active = false;
        let mut deleted = venue("Deleted", 25.0, 55.0);
        deleted.deleted_at = Some(Utc::now());
        let listed = venue("Listed", 25.0, 55.0);

        let engine = engine(vec![pending, inactive, deleted, listed]);
        let page = engine.search(&VenueFilters::default()).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].venue.name, "Listed");
    }

    #[tokio::test]
    async fn amenity_filter_requires_every_listed_amenity() {
        let mut both = venue("Both", 25.0, 55.0);
        both.amenities = vec!["wifi".to_string(), "parking".to_string()];
        let mut one = venue("One", 25.0, 55.0);
        one.amenities = vec!["wifi".to_string()];

        let engine = engine(vec![both, one]);
        let filters = VenueFilters {
            amenities: vec!["wifi".to_string(), "parking".to_string()],
            ..Default::default()
        };
        let page = engine.search(&filters).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].venue.name, "Both");
    }
}
