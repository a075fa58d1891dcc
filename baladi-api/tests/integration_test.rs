use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use baladi_api::middleware::auth::{AdminClaims, CustomerClaims};
use baladi_api::state::{AppState, AuthConfig};
use baladi_api::app;
use baladi_core::clock::{Clock, FixedClock};
use baladi_offer::eligibility::{EligibilityConfig, EligibilityEngine};
use baladi_offer::model::{NewOffer, Offer, OfferStatus};
use baladi_offer::store::OfferStore;
use baladi_store::{MemoryStore, RedisClient};
use baladi_venue::filters::SearchLimits;
use baladi_venue::geo::GeoPoint;
use baladi_venue::model::{Venue, VenueStatus};
use baladi_venue::search::{SearchEngine, VenueStore};

const SECRET: &str = "integration-test-secret";

fn test_state(now: DateTime<Utc>) -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let offers: Arc<dyn OfferStore> = store.clone();
    let venues: Arc<dyn VenueStore> = store.clone();
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(now));

    let eligibility = Arc::new(EligibilityEngine::new(
        offers.clone(),
        clock.clone(),
        EligibilityConfig::default(),
    ));
    let search = Arc::new(SearchEngine::new(venues.clone(), SearchLimits::default()));
    let (events_tx, _) = tokio::sync::broadcast::channel(16);

    let state = AppState {
        offers,
        venues,
        eligibility,
        search,
        clock,
        // Never connected to in these tests; the limiter fails open.
        redis: Arc::new(RedisClient::new("redis://127.0.0.1:1").unwrap()),
        events_tx,
        auth: AuthConfig {
            secret: SECRET.to_string(),
            expiration: 3600,
        },
    };
    (state, store)
}

fn customer_token(user_id: Uuid) -> String {
    let claims = CustomerClaims {
        sub: user_id.to_string(),
        role: "CUSTOMER".to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn admin_token() -> String {
    let claims = AdminClaims {
        sub: Uuid::new_v4().to_string(),
        role: "ADMIN".to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn listed_venue(name: &str, lat: f64, lng: f64) -> Venue {
    Venue {
        id: Uuid::new_v4(),
        business_id: Uuid::new_v4(),
        category_id: Uuid::new_v4(),
        subcategory_id: None,
        name: name.to_string(),
        name_ar: None,
        description: None,
        description_ar: None,
        city: Some("Dubai".to_string()),
        region: Some("Dubai".to_string()),
        location: GeoPoint::new(lat, lng),
        amenities: Vec::new(),
        price_tier: None,
        women_only: false,
        is_featured: false,
        is_active: true,
        status: VenueStatus::Approved,
        average_rating: 4.0,
        total_reviews: 10,
        total_visits: 0,
        created_at: Utc::now(),
        deleted_at: None,
    }
}

fn approved_offer(now: DateTime<Utc>, usage_limit: Option<i32>, per_user: Option<i32>) -> Offer {
    let mut offer = Offer::create(
        NewOffer {
            business_id: Uuid::new_v4(),
            venue_id: None,
            title: "Ladies night special".to_string(),
            title_ar: None,
            description: None,
            description_ar: None,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(7),
            usage_limit,
            usage_limit_per_user: per_user,
        },
        now - Duration::days(2),
    );
    offer.status = OfferStatus::Approved;
    offer
}

#[tokio::test]
async fn search_filters_by_radius_and_reports_distance() {
    let now = Utc::now();
    let (state, store) = test_state(now);
    let downtown = listed_venue("Downtown Majlis", 25.2048, 55.2708);
    store.seed_venue(downtown.clone());
    store.seed_venue(listed_venue("Corniche Terrace", 24.4539, 54.3773));

    let (status, body) = send(
        app(state),
        get("/v1/venues/search?latitude=25.2048&longitude=55.2708&radius=1&sort_by=distance"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["name"], "Downtown Majlis");
    assert!(body["items"][0]["distance_km"].as_f64().unwrap() < 1.0);
}

#[tokio::test]
async fn search_rejects_invalid_filters() {
    let (state, _) = test_state(Utc::now());

    let (status, body) = send(
        app(state.clone()),
        get("/v1/venues/search?latitude=99.0&longitude=55.0"),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("coordinates"));

    let (status, _) = send(
        app(state.clone()),
        get("/v1/venues/search?latitude=25.0&longitude=55.0&radius=500"),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Half a coordinate pair is caller error too.
    let (status, _) = send(app(state), get("/v1/venues/search?latitude=25.0")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn search_relevance_ordering_is_stable() {
    let now = Utc::now();
    let (state, store) = test_state(now);

    let mut quiet = listed_venue("Quiet Cafe", 25.0, 55.0);
    quiet.average_rating = 4.5;
    quiet.total_reviews = 3;
    let mut busy = listed_venue("Busy Cafe", 25.0, 55.0);
    busy.average_rating = 4.5;
    busy.total_reviews = 120;
    store.seed_venue(quiet);
    store.seed_venue(busy);

    let (status, body) = send(app(state), get("/v1/venues/search")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["name"], "Busy Cafe");
    assert_eq!(body["items"][1]["name"], "Quiet Cafe");
}

#[tokio::test]
async fn redeem_requires_authentication() {
    let now = Utc::now();
    let (state, store) = test_state(now);
    let offer = approved_offer(now, None, None);
    let offer_id = offer.id;
    store.seed_offer(offer);

    let request = Request::builder()
        .method("POST")
        .uri(format!("/v1/offers/{offer_id}/redeem"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app(state), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn redeem_flow_creates_redemption_and_emits_event() {
    let now = Utc::now();
    let (state, store) = test_state(now);
    let offer = approved_offer(now, Some(1), None);
    let offer_id = offer.id;
    store.seed_offer(offer);

    let mut events = state.events_tx.subscribe();
    let user = Uuid::new_v4();
    let request = Request::builder()
        .method("POST")
        .uri(format!("/v1/offers/{offer_id}/redeem"))
        .header(header::AUTHORIZATION, format!("Bearer {}", customer_token(user)))
        .header(header::USER_AGENT, "baladi-tests/1.0")
        .header("x-forwarded-for", "203.0.113.9")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(state.clone()), request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["offer_id"], json!(offer_id));
    assert_eq!(body["status"], "completed");
    assert_eq!(body["verification_code"].as_str().unwrap().len(), 8);

    let event = events.try_recv().unwrap();
    assert_eq!(event.offer_id, offer_id);
    assert_eq!(event.user_id, user);

    // The single-use offer is now exhausted for everyone else.
    let request = Request::builder()
        .method("POST")
        .uri(format!("/v1/offers/{offer_id}/redeem"))
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", customer_token(Uuid::new_v4())),
        )
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(state.clone()), request).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "exhausted");

    let stored = state.offers.get_offer(offer_id).await.unwrap().unwrap();
    assert_eq!(stored.used_count, 1);
}

#[tokio::test]
async fn eligibility_endpoint_tracks_the_per_user_limit() {
    let now = Utc::now();
    let (state, store) = test_state(now);
    let offer = approved_offer(now, None, Some(1));
    let offer_id = offer.id;
    store.seed_offer(offer);

    let user = Uuid::new_v4();
    let token = customer_token(user);

    let authed_get = |uri: String, token: String| {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = send(
        app(state.clone()),
        authed_get(format!("/v1/offers/{offer_id}/eligibility"), token.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["can_redeem"], true);

    let request = Request::builder()
        .method("POST")
        .uri(format!("/v1/offers/{offer_id}/redeem"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app(state.clone()), request).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app(state.clone()),
        authed_get(format!("/v1/offers/{offer_id}/eligibility"), token.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["can_redeem"], false);

    let request = Request::builder()
        .method("POST")
        .uri(format!("/v1/offers/{offer_id}/redeem"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(state), request).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "user_limit_exceeded");
}

#[tokio::test]
async fn admin_moderation_flow_makes_an_offer_redeemable() {
    let now = Utc::now();
    let (state, _store) = test_state(now);
    let token = admin_token();

    let (status, body) = send(
        app(state.clone()),
        post_json(
            "/v1/admin/offers",
            &token,
            json!({
                "business_id": Uuid::new_v4(),
                "title": "Opening week deal",
                "start_date": now - Duration::days(1),
                "end_date": now + Duration::days(14),
                "usage_limit": 100,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    let offer_id = body["id"].as_str().unwrap().to_string();

    // Pending offers read as not redeemable.
    let (status, body) = send(app(state.clone()), get(&format!("/v1/offers/{offer_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_redeemable"], false);

    let (status, _) = send(
        app(state.clone()),
        post_json(
            &format!("/v1/admin/offers/{offer_id}/approve"),
            &token,
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(app(state.clone()), get(&format!("/v1/offers/{offer_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_redeemable"], true);

    // Customers cannot reach moderation endpoints.
    let (status, _) = send(
        app(state.clone()),
        post_json(
            &format!("/v1/admin/offers/{offer_id}/reject"),
            &customer_token(Uuid::new_v4()),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Soft delete hides it from the public endpoint.
    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/v1/admin/offers/{offer_id}"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app(state.clone()), request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(app(state), get(&format!("/v1/offers/{offer_id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn visits_deduplicate_per_day_via_the_api() {
    let now = Utc::now();
    let (state, store) = test_state(now);
    let venue = listed_venue("Harbour Walk", 25.1, 55.2);
    let venue_id = venue.id;
    store.seed_venue(venue);

    let token = customer_token(Uuid::new_v4());
    let (status, first) = send(
        app(state.clone()),
        post_json(&format!("/v1/venues/{venue_id}/visit"), &token, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, second) = send(
        app(state.clone()),
        post_json(
            &format!("/v1/venues/{venue_id}/visit"),
            &token,
            json!({ "source": "qr" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["id"], second["id"]);

    let (status, body) = send(app(state), get(&format!("/v1/venues/{venue_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_visits"], 1);
}
