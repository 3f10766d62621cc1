//! HTTP route handlers.

use std::path::Path;

use axum::{
    Json, Router,
    extract::{Path as UrlPath, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::domain::FacilityId;
use crate::geo::Position;
use crate::listing::{
    DEFAULT_NEAREST, SortKey, SortOrder, nearest, search_facilities, sort_facilities,
};

use super::dto::*;
use super::state::AppState;

/// Upper bound on `n` for the nearest endpoint.
const MAX_NEAREST: usize = 50;

/// Create the application router.
///
/// `static_dir`, when given, is served at `/` for the browser UI.
pub fn create_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/api/facilities", get(list_facilities))
        .route("/api/facilities/search", get(search))
        .route("/api/facilities/nearest", get(nearest_facilities))
        .route("/api/facilities/:id", get(facility_by_id))
        .route("/api/occupancy", get(refresh_occupancy))
        .route("/api/refresh", post(force_refresh))
        .with_state(state);

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// The full list, sorted.
async fn list_facilities(
    State(state): State<AppState>,
    Query(req): Query<ListFacilitiesRequest>,
) -> Result<Json<FacilityListResponse>, AppError> {
    let key = match req.sort.as_deref() {
        Some(s) => s.parse::<SortKey>().map_err(|e| AppError::BadRequest {
            message: e.to_string(),
        })?,
        None => SortKey::default(),
    };
    let reference = reference_point(req.lat, req.lon)?;

    let order = match key {
        SortKey::Name => SortOrder::Name,
        SortKey::Availability => SortOrder::Availability,
        SortKey::Distance => SortOrder::Distance(reference.unwrap_or(state.default_location)),
    };
    // Distances are reported whenever there is a point to measure from
    let measure_from = match order {
        SortOrder::Distance(p) => Some(p),
        _ => reference,
    };

    let include_unresolved = req.include_unresolved.unwrap_or(true);
    let list = state.snapshot().await;
    let facilities = sort_facilities(&list.facilities, order)
        .into_iter()
        .filter(|f| include_unresolved || f.is_resolved())
        .map(|f| FacilityResult::from_facility(f, measure_from))
        .collect();

    Ok(Json(FacilityListResponse::new(&list, facilities)))
}

/// Free-text search over name, station code and id.
async fn search(
    State(state): State<AppState>,
    Query(req): Query<SearchFacilitiesRequest>,
) -> Json<FacilityListResponse> {
    let list = state.snapshot().await;
    let facilities = search_facilities(&list.facilities, &req.q)
        .into_iter()
        .map(|f| FacilityResult::from_facility(f, None))
        .collect();

    Json(FacilityListResponse::new(&list, facilities))
}

/// The closest resolved facilities to a point.
async fn nearest_facilities(
    State(state): State<AppState>,
    Query(req): Query<NearestRequest>,
) -> Result<Json<FacilityListResponse>, AppError> {
    let reference = reference_point(req.lat, req.lon)?.unwrap_or(state.default_location);
    let n = req.n.unwrap_or(DEFAULT_NEAREST).min(MAX_NEAREST);

    let list = state.snapshot().await;
    let facilities = nearest(&list.facilities, reference, n)
        .into_iter()
        .map(|(f, _)| FacilityResult::from_facility(f, Some(reference)))
        .collect();

    Ok(Json(FacilityListResponse::new(&list, facilities)))
}

/// One facility by id.
async fn facility_by_id(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<String>,
) -> Result<Json<FacilityResult>, AppError> {
    let list = state.snapshot().await;
    let facility = list
        .get(&FacilityId::new(id.as_str()))
        .ok_or_else(|| AppError::NotFound {
            message: format!("Facility {id} not found"),
        })?;

    Ok(Json(FacilityResult::from_facility(facility, None)))
}

/// Fetch fresh occupancy and merge it into the current list.
async fn refresh_occupancy(State(state): State<AppState>) -> Json<OccupancyResponse> {
    let update = state.refresh_occupancy().await;

    let provenance = Provenance {
        source: update.served_by,
        degraded: update.degraded,
        demo: update.list.is_demo(),
        fetched_at: update.list.fetched_at,
    };
    let occupancy = update
        .list
        .facilities
        .iter()
        .map(OccupancyResult::from_facility)
        .collect();

    Json(OccupancyResponse {
        provenance,
        occupancy,
    })
}

/// Run a full cycle now, bypassing cached source answers.
async fn force_refresh(State(state): State<AppState>) -> Json<FacilityListResponse> {
    let list = state.force_refresh().await;
    let facilities = list
        .facilities
        .iter()
        .map(|f| FacilityResult::from_facility(f, None))
        .collect();

    Json(FacilityListResponse::new(&list, facilities))
}

/// A reference point from optional query coordinates.
///
/// Both or neither must be given; given ones must be real coordinates.
fn reference_point(lat: Option<f64>, lon: Option<f64>) -> Result<Option<Position>, AppError> {
    match (lat, lon) {
        (None, None) => Ok(None),
        (Some(lat), Some(lon)) => {
            let valid = lat.is_finite()
                && lon.is_finite()
                && (-90.0..=90.0).contains(&lat)
                && (-180.0..=180.0).contains(&lon);
            if valid {
                Ok(Some(Position::new(lat, lon)))
            } else {
                Err(AppError::BadRequest {
                    message: format!("Invalid coordinates: {lat},{lon}"),
                })
            }
        }
        _ => Err(AppError::BadRequest {
            message: "lat and lon must be given together".to_string(),
        }),
    }
}

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    BadRequest { message: String },
    #[error("{message}")]
    NotFound { message: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
        };
        let message = self.to_string();

        warn!(status = %status, error = %message, "request failed");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::Value;

    use super::*;
    use crate::pipeline::Reconciler;
    use crate::sources::MockSource;
    use crate::sources::stub::serve;

    const SEVEN_HILLS: Position = Position {
        latitude: -33.7738,
        longitude: 150.9351,
    };

    async fn demo_server() -> String {
        let reconciler = Reconciler::new(vec![Arc::new(MockSource::builtin())]);
        let state = AppState::new(reconciler, SEVEN_HILLS);
        state.refresh().await;
        serve(create_router(state, None)).await
    }

    async fn get_json(url: &str) -> (StatusCode, Value) {
        let resp = reqwest::get(url).await.unwrap();
        let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
        (status, resp.json().await.unwrap())
    }

    fn ids(body: &Value) -> Vec<String> {
        body["facilities"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["station_code"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn health() {
        let base = demo_server().await;
        let body = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn list_sorted_by_name_with_provenance() {
        let base = demo_server().await;
        let (status, body) = get_json(&format!("{base}/api/facilities")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "mock");
        assert_eq!(body["demo"], true);
        assert_eq!(body["degraded"], false);
        assert!(body["fetched_at"].is_string());
        assert_eq!(ids(&body), ["BVA", "GDN", "HSG", "KVE", "TWG"]);

        let bella_vista = &body["facilities"][0];
        assert_eq!(bella_vista["spots_free"], 5);
        assert_eq!(bella_vista["availability"], "full");
        assert!(bella_vista["distance_km"].is_null());
        assert_eq!(
            bella_vista["directions_url"],
            "https://www.google.com/maps/dir/?api=1&destination=-33.7299,150.9577"
        );
    }

    #[tokio::test]
    async fn list_sorted_by_availability() {
        let base = demo_server().await;
        let (_, body) = get_json(&format!("{base}/api/facilities?sort=availability")).await;
        assert_eq!(ids(&body), ["KVE", "HSG", "TWG", "GDN", "BVA"]);
    }

    #[tokio::test]
    async fn distance_sort_defaults_to_configured_location() {
        let base = demo_server().await;
        let (_, body) = get_json(&format!("{base}/api/facilities?sort=distance")).await;
        assert_eq!(ids(&body)[..3], ["BVA", "KVE", "HSG"]);
        assert!(body["facilities"][0]["distance_km"].as_f64().unwrap() > 5.3);
    }

    #[tokio::test]
    async fn bad_requests_are_json_errors() {
        let base = demo_server().await;

        let (status, body) = get_json(&format!("{base}/api/facilities?sort=price")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("price"));

        let (status, _) = get_json(&format!("{base}/api/facilities/nearest?lat=-33.7")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            get_json(&format!("{base}/api/facilities/nearest?lat=123&lon=150.9")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn search_by_station_code() {
        let base = demo_server().await;
        let (_, body) = get_json(&format!("{base}/api/facilities/search?q=twg")).await;
        assert_eq!(ids(&body), ["TWG"]);

        let (_, body) = get_json(&format!("{base}/api/facilities/search?q=")).await;
        assert!(ids(&body).is_empty());
    }

    #[tokio::test]
    async fn nearest_three() {
        let base = demo_server().await;
        let (_, body) = get_json(&format!(
            "{base}/api/facilities/nearest?lat=-33.7738&lon=150.9351"
        ))
        .await;

        assert_eq!(ids(&body), ["BVA", "KVE", "HSG"]);
        let d = body["facilities"][0]["distance_km"].as_f64().unwrap();
        assert!((d - 5.30984).abs() < 0.01);

        let (_, body) = get_json(&format!("{base}/api/facilities/nearest?n=1")).await;
        assert_eq!(ids(&body), ["BVA"]);
    }

    #[tokio::test]
    async fn facility_by_id_and_missing() {
        let base = demo_server().await;
        let (status, body) = get_json(&format!("{base}/api/facilities/2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["station_code"], "KVE");

        let (status, body) = get_json(&format!("{base}/api/facilities/999")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("999"));
    }

    #[tokio::test]
    async fn occupancy_refresh() {
        let base = demo_server().await;
        let (status, body) = get_json(&format!("{base}/api/occupancy")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "mock");
        assert_eq!(body["occupancy"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn forced_refresh() {
        let base = demo_server().await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/api/refresh"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["facilities"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn serves_static_ui() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>Park&Ride</h1>").unwrap();

        let reconciler = Reconciler::new(vec![Arc::new(MockSource::builtin())]);
        let state = AppState::new(reconciler, SEVEN_HILLS);
        let base = serve(create_router(state, Some(dir.path()))).await;

        let body = reqwest::get(format!("{base}/"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "<h1>Park&Ride</h1>");
    }
}
