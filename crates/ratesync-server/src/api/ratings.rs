//! Admin control surface for the rating scheduler.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use ratesync_engine::{
    BatchRunSummary, DetailedStatus, ListCache, RatingStore, ReviewSource, SchedulerError,
    SchedulerOutcome, SchedulerRunStats, SchedulerService,
};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, ResponseMeta};

pub(crate) struct RatingsState<R, S, C> {
    scheduler: Arc<SchedulerService<R, S, C>>,
}

// Derived Clone would require R, S, C: Clone.
impl<R, S, C> Clone for RatingsState<R, S, C> {
    fn clone(&self) -> Self {
        Self {
            scheduler: Arc::clone(&self.scheduler),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct IntervalRequest {
    minutes: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct UpdateRatingsRequest {
    #[serde(default, rename = "vendorIds", alias = "vendor_ids")]
    vendor_ids: Option<Vec<String>>,
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Routes under `/api/v1/admin/ratings`, bound to `scheduler`.
pub fn router<R, S, C>(scheduler: Arc<SchedulerService<R, S, C>>) -> Router
where
    R: ReviewSource,
    S: RatingStore,
    C: ListCache,
{
    Router::new()
        .route("/api/v1/admin/ratings/status", get(status::<R, S, C>))
        .route("/api/v1/admin/ratings/start", post(start::<R, S, C>))
        .route("/api/v1/admin/ratings/stop", post(stop::<R, S, C>))
        .route("/api/v1/admin/ratings/restart", post(restart::<R, S, C>))
        .route("/api/v1/admin/ratings/interval", put(set_interval::<R, S, C>))
        .route(
            "/api/v1/admin/ratings/update-ratings",
            post(update_ratings::<R, S, C>),
        )
        .route("/api/v1/admin/ratings/stats", get(stats::<R, S, C>))
        .with_state(RatingsState { scheduler })
}

fn ok<T: serde::Serialize>(data: T, req_id: RequestId) -> ApiResult<T> {
    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn map_scheduler_error(request_id: String, err: &SchedulerError) -> ApiError {
    match err {
        SchedulerError::InvalidInterval { .. } => {
            ApiError::new(request_id, "validation_error", err.to_string())
        }
        SchedulerError::RunInProgress => ApiError::new(request_id, "conflict", err.to_string()),
        SchedulerError::Timer(_) => {
            tracing::error!(error = %err, "scheduler control operation failed");
            ApiError::new(request_id, "internal_error", "scheduler operation failed")
        }
    }
}

fn control_response(
    req_id: RequestId,
    result: Result<SchedulerOutcome, SchedulerError>,
) -> ApiResult<SchedulerOutcome> {
    match result {
        Ok(outcome) if outcome.success => ok(outcome, req_id),
        Ok(outcome) => Err(ApiError::new(req_id.0, "conflict", outcome.message)),
        Err(e) => Err(map_scheduler_error(req_id.0, &e)),
    }
}

async fn status<R, S, C>(
    State(state): State<RatingsState<R, S, C>>,
    Extension(req_id): Extension<RequestId>,
) -> ApiResult<DetailedStatus>
where
    R: ReviewSource,
    S: RatingStore,
    C: ListCache,
{
    ok(state.scheduler.detailed_status().await, req_id)
}

async fn start<R, S, C>(
    State(state): State<RatingsState<R, S, C>>,
    Extension(req_id): Extension<RequestId>,
) -> ApiResult<SchedulerOutcome>
where
    R: ReviewSource,
    S: RatingStore,
    C: ListCache,
{
    control_response(req_id, state.scheduler.start().await)
}

async fn stop<R, S, C>(
    State(state): State<RatingsState<R, S, C>>,
    Extension(req_id): Extension<RequestId>,
) -> ApiResult<SchedulerOutcome>
where
    R: ReviewSource,
    S: RatingStore,
    C: ListCache,
{
    control_response(req_id, state.scheduler.stop().await)
}

async fn restart<R, S, C>(
    State(state): State<RatingsState<R, S, C>>,
    Extension(req_id): Extension<RequestId>,
) -> ApiResult<SchedulerOutcome>
where
    R: ReviewSource,
    S: RatingStore,
    C: ListCache,
{
    control_response(req_id, state.scheduler.restart().await)
}

async fn set_interval<R, S, C>(
    State(state): State<RatingsState<R, S, C>>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<IntervalRequest>, JsonRejection>,
) -> ApiResult<SchedulerOutcome>
where
    R: ReviewSource,
    S: RatingStore,
    C: ListCache,
{
    let Json(body) = body.map_err(|rejection| {
        ApiError::new(req_id.0.clone(), "validation_error", rejection.body_text())
    })?;

    control_response(req_id, state.scheduler.set_interval(body.minutes).await)
}

/// Empty body or empty `vendorIds` runs every vendor; otherwise only the
/// listed ones. Unknown body keys are rejected.
async fn update_ratings<R, S, C>(
    State(state): State<RatingsState<R, S, C>>,
    Extension(req_id): Extension<RequestId>,
    body: Bytes,
) -> ApiResult<BatchRunSummary>
where
    R: ReviewSource,
    S: RatingStore,
    C: ListCache,
{
    let request = parse_update_request(&body)
        .map_err(|message| ApiError::new(req_id.0.clone(), "validation_error", message))?;

    match request.vendor_ids {
        Some(ids) if !ids.is_empty() => {
            tracing::info!(vendors = ids.len(), "ratings: manual subset run requested");
            ok(state.scheduler.trigger_vendor_run(&ids).await, req_id)
        }
        _ => {
            tracing::info!("ratings: manual full run requested");
            match state.scheduler.trigger_full_run().await {
                Ok(summary) => ok(summary, req_id),
                Err(e) => Err(map_scheduler_error(req_id.0, &e)),
            }
        }
    }
}

fn parse_update_request(body: &[u8]) -> Result<UpdateRatingsRequest, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(UpdateRatingsRequest::default());
    }

    let mut request: UpdateRatingsRequest =
        serde_json::from_slice(body).map_err(|e| format!("invalid request body: {e}"))?;

    if let Some(ids) = request.vendor_ids.as_mut() {
        if ids.iter().any(|id| id.trim().is_empty()) {
            return Err("vendorIds must not contain blank entries".to_string());
        }
        for id in ids.iter_mut() {
            *id = id.trim().to_string();
        }
    }

    Ok(request)
}

async fn stats<R, S, C>(
    State(state): State<RatingsState<R, S, C>>,
    Extension(req_id): Extension<RequestId>,
) -> ApiResult<SchedulerRunStats>
where
    R: ReviewSource,
    S: RatingStore,
    C: ListCache,
{
    ok(state.scheduler.stats().await, req_id)
}
