use axum::{extract::State, routing::get, Json, Router};
use tracing::{debug, instrument};

use crate::{
    entries::{repo, services},
    error::AppError,
    nutrition::aggregate::{self, Averages, Trend},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stats/averages", get(get_averages))
        .route("/stats/trend", get(get_trend))
}

/// Whole-history means, computed in SQL.
#[instrument(skip(state))]
pub async fn get_averages(State(state): State<AppState>) -> Result<Json<Averages>, AppError> {
    let avg = repo::averages(&state.db).await?;
    debug!(count = avg.count, "averages computed");
    Ok(Json(avg))
}

/// Running means per day, oldest first, plus the latest values.
#[instrument(skip(state))]
pub async fn get_trend(State(state): State<AppState>) -> Result<Json<Trend>, AppError> {
    let history = services::history(&state).await?;
    Ok(Json(aggregate::trend(&history)))
}
