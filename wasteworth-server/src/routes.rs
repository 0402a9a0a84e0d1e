use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{Method, StatusCode, header::CONTENT_TYPE},
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use wasteworth_core::{
    CollectorId, CollectorRecord, ProfileUpdate, ProximityQuery, RequestDraft, RequestId,
    RequestStatus, ServiceRequest,
};

use crate::{
    dto::{NearbyCollector, StatusUpdate},
    error::AppError,
    extract::{AppJson, AppPath},
    state::AppState,
};

type SharedState = Arc<AppState>;

pub(crate) fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/client/collectors/nearby", get(nearby_handler))
        .route("/api/collectors/:id", get(collector_handler))
        .route("/api/collectors/:id/profile", put(profile_handler))
        .route("/api/collectors/:id/requests", get(collector_requests_handler))
        .route("/api/requests", post(create_request_handler))
        .route("/api/requests/:id/status", put(request_status_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

// Query is read as a plain map so that odd input (duplicates, junk) falls back to defaults.
async fn nearby_handler(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<NearbyCollector>>, AppError> {
    let query = ProximityQuery::from_params(
        params.get("lat").map(String::as_str),
        params.get("lng").map(String::as_str),
        params.get("radius").map(String::as_str),
        params.get("limit").map(String::as_str),
    );

    let results = state.service.find_nearby(query).await?;
    Ok(Json(results.into_iter().map(NearbyCollector::from).collect()))
}

async fn collector_handler(
    State(state): State<SharedState>,
    AppPath(id): AppPath<u64>,
) -> Result<Json<CollectorRecord>, AppError> {
    Ok(Json(state.service.collector_profile(CollectorId(id)).await?))
}

async fn profile_handler(
    State(state): State<SharedState>,
    AppPath(id): AppPath<u64>,
    AppJson(update): AppJson<ProfileUpdate>,
) -> Result<Json<CollectorRecord>, AppError> {
    Ok(Json(state.service.update_profile(CollectorId(id), update).await?))
}

async fn collector_requests_handler(
    State(state): State<SharedState>,
    AppPath(id): AppPath<u64>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<ServiceRequest>>, AppError> {
    let status = match params.get("status").map(|raw| raw.trim()) {
        None | Some("") => None,
        Some(raw) => Some(
            RequestStatus::parse(raw)
                .ok_or_else(|| AppError::MalformedPayload(format!("unknown status {raw:?}")))?,
        ),
    };

    let requests = state
        .service
        .requests_for_collector(CollectorId(id), status)
        .await?;
    Ok(Json(requests))
}

async fn create_request_handler(
    State(state): State<SharedState>,
    AppJson(draft): AppJson<RequestDraft>,
) -> Result<(StatusCode, Json<ServiceRequest>), AppError> {
    let request = state.service.create_request(draft).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn request_status_handler(
    State(state): State<SharedState>,
    AppPath(id): AppPath<u64>,
    AppJson(update): AppJson<StatusUpdate>,
) -> Result<Json<ServiceRequest>, AppError> {
    let request = state
        .service
        .update_request_status(RequestId(id), update.status)
        .await?;
    Ok(Json(request))
}
