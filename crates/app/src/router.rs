use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;

use roll_stock_core::{DomainResult, Roll, RollFilter, RollStatistics};
use roll_stock_storage::Database;

use crate::problem::ProblemResponse;
use crate::service::RollService;
use crate::telemetry;

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    service: RollService,
}

impl AppState {
    pub fn new(metrics: PrometheusHandle, storage: Database) -> Self {
        let service = RollService::new(storage);
        Self { metrics, service }
    }

    #[cfg(test)]
    pub fn with_clock(
        mut self,
        clock: std::sync::Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
    ) -> Self {
        self.service = self.service.with_clock(clock);
        self
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn service(&self) -> &RollService {
        &self.service
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/api/rolls", get(list_rolls).post(create_roll))
        .route("/api/rolls/statistics", get(statistics))
        .route("/api/rolls/:id", get(get_roll).put(remove_roll))
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
        .body(Body::from(body))
        .unwrap()
}

/// Counts the request under its operation label and lifts domain
/// failures into problem responses.
fn track<T>(op: &'static str, outcome: DomainResult<T>) -> Result<T, ProblemResponse> {
    match outcome {
        Ok(value) => {
            counter!("rolls_api_requests_total", "op" => op, "result" => "ok").increment(1);
            Ok(value)
        }
        Err(err) => {
            counter!("rolls_api_requests_total", "op" => op, "result" => err.kind()).increment(1);
            Err(ProblemResponse::from_domain(&err))
        }
    }
}

async fn list_rolls(
    State(state): State<AppState>,
    Query(filter): Query<RollFilter>,
) -> Result<Json<Vec<Roll>>, ProblemResponse> {
    track("list", state.service().list(&filter).await).map(Json)
}

async fn get_roll(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Roll>, ProblemResponse> {
    track("get", state.service().get(id).await).map(Json)
}

#[derive(Debug, Deserialize)]
struct CreateRollRequest {
    length: f64,
    weight: f64,
}

async fn create_roll(
    State(state): State<AppState>,
    Json(body): Json<CreateRollRequest>,
) -> Result<(StatusCode, Json<Roll>), ProblemResponse> {
    // Input-shape validation lives here, not in the service.
    for (name, value) in [("length", body.length), ("weight", body.weight)] {
        if !value.is_finite() || value <= 0.0 {
            return Err(ProblemResponse::new(
                StatusCode::BAD_REQUEST,
                "validation",
                format!("{name} must be a positive number"),
            ));
        }
    }

    let roll = track("create", state.service().add(body.length, body.weight).await)?;
    Ok((StatusCode::CREATED, Json(roll)))
}

#[derive(Debug, Deserialize)]
struct RemoveRollRequest {
    remove_at: DateTime<Utc>,
}

async fn remove_roll(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<RemoveRollRequest>,
) -> Result<Json<Roll>, ProblemResponse> {
    track("remove", state.service().remove(id, body.remove_at).await).map(Json)
}

#[derive(Debug, Deserialize)]
struct StatisticsQuery {
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
}

async fn statistics(
    State(state): State<AppState>,
    Query(query): Query<StatisticsQuery>,
) -> Result<Json<RollStatistics>, ProblemResponse> {
    let outcome = state
        .service()
        .statistics(query.start_date, query.end_date)
        .await;
    track("statistics", outcome).map(Json)
}
