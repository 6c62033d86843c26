//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::{
    engine::BulkAction,
    error::ServiceError,
    services::{self, NewTimer},
    state::{AppState, HistoryEntry, Timer},
};
use super::responses::{
    group_by_category, ApiResponse, BulkResponse, CategoryGroup, ErrorResponse, HealthResponse,
    TimerView,
};

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

/// Map a service failure onto a status code and error body
fn api_error(e: ServiceError) -> ApiError {
    let status = match &e {
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::Store(_) | ServiceError::CompletionNotSaved { .. } => {
            error!("Store operation failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorResponse::new(e.to_string())))
}

fn view(state: &AppState, timer: &Timer) -> Json<TimerView> {
    Json(TimerView::observe(timer, state.now()))
}

/// Handle GET /timers - List timers with live remaining time
pub async fn list_timers_handler(State(state): State<Arc<AppState>>) -> Json<Vec<TimerView>> {
    let now = state.now();
    let timers = services::list_timers(&state).await;
    Json(timers.iter().map(|t| TimerView::observe(t, now)).collect())
}

/// Handle POST /timers - Create a stopped timer
pub async fn create_timer_handler(
    State(state): State<Arc<AppState>>,
    Json(new_timer): Json<NewTimer>,
) -> Result<(StatusCode, Json<TimerView>), ApiError> {
    let timer = services::create_timer(&state, new_timer).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, view(&state, &timer)))
}

/// Handle GET /timers/:id - One timer with live remaining time
pub async fn get_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<TimerView> {
    let timer = services::get_timer(&state, &id).await.map_err(api_error)?;
    Ok(view(&state, &timer))
}

/// Handle DELETE /timers/:id - Delete a timer and stop its countdown
pub async fn delete_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<TimerView> {
    let timer = services::delete_timer(&state, &id).await.map_err(api_error)?;
    Ok(view(&state, &timer))
}

/// Handle POST /timers/:id/start
pub async fn start_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<TimerView> {
    let timer = services::start_timer(&state, &id).await.map_err(api_error)?;
    Ok(view(&state, &timer))
}

/// Handle POST /timers/:id/pause
pub async fn pause_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<TimerView> {
    let timer = services::pause_timer(&state, &id).await.map_err(api_error)?;
    Ok(view(&state, &timer))
}

/// Handle POST /timers/:id/reset
pub async fn reset_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<TimerView> {
    let timer = services::reset_timer(&state, &id).await.map_err(api_error)?;
    Ok(view(&state, &timer))
}

/// Handle GET /categories - Timers grouped by category
pub async fn list_categories_handler(State(state): State<Arc<AppState>>) -> Json<Vec<CategoryGroup>> {
    let timers = services::list_timers(&state).await;
    Json(group_by_category(&timers, state.now()))
}

/// Handle POST /categories/:category/:action - start, pause or reset a whole category
pub async fn bulk_action_handler(
    State(state): State<Arc<AppState>>,
    Path((category, action)): Path<(String, String)>,
) -> ApiResult<BulkResponse> {
    let action: BulkAction = action.parse().map_err(|e: String| {
        warn!("Rejected bulk action for {}: {}", category, e);
        (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e)))
    })?;

    let timers = services::apply_bulk(&state, &category, action)
        .await
        .map_err(api_error)?;
    info!("Bulk {} endpoint called for {}", action, category);

    let now = state.now();
    Ok(Json(BulkResponse {
        category,
        action,
        timers: timers.iter().map(|t| TimerView::observe(t, now)).collect(),
    }))
}

/// Handle GET /history - Completion log in completion order
pub async fn history_handler(State(state): State<Arc<AppState>>) -> Json<Vec<HistoryEntry>> {
    Json(services::list_history(&state).await)
}

/// Handle DELETE /history - Clear the completion log
pub async fn clear_history_handler(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse> {
    services::clear_history(&state).await.map_err(api_error)?;
    Ok(Json(ApiResponse::ok("History cleared")))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (last_action, last_action_time) = state.get_last_action();
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: state.get_uptime(),
        active_countdowns: state.countdowns.active_count(),
        last_action,
        last_action_time,
    })
}
