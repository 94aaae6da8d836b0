use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use time::Date;
use tracing::{error, instrument};

use super::dto::{EntryResponse, EstimatedEntryRequest, PastedEntryRequest, TemplateResponse};
use super::{repo, services};
use crate::{
    error::AppError,
    nutrition::{NutritionRecord, TEMPLATE},
    state::AppState,
};

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/entries", get(list_entries))
        .route("/entries/:date", get(get_entry))
        .route("/entries/:date/text", get(get_entry_text))
        .route("/template", get(get_template))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/entries/pasted", post(create_pasted))
        .route("/entries/estimated", post(create_estimated))
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_entries(State(state): State<AppState>) -> Result<Json<Vec<EntryResponse>>, AppError> {
    let rows = repo::list_all(&state.db).await.map_err(|e| {
        error!(error = %e, "list_entries failed");
        e
    })?;
    Ok(Json(rows.into_iter().map(EntryResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_entry(
    State(state): State<AppState>,
    Path(date): Path<Date>,
) -> Result<Json<EntryResponse>, AppError> {
    match repo::find_by_date(&state.db, date).await? {
        Some(row) => Ok(Json(row.into())),
        None => Err(AppError::NotFound(date)),
    }
}

/// The stored entry rendered back into the pasted "Key: value" format.
#[instrument(skip(state))]
pub async fn get_entry_text(
    State(state): State<AppState>,
    Path(date): Path<Date>,
) -> Result<String, AppError> {
    let row = repo::find_by_date(&state.db, date)
        .await?
        .ok_or(AppError::NotFound(date))?;
    Ok(NutritionRecord::from(row).to_structured_text())
}

pub async fn get_template() -> Json<TemplateResponse> {
    Json(TemplateResponse { template: TEMPLATE })
}

/// POST /entries/pasted { date?, text }
#[instrument(skip(state, body))]
pub async fn create_pasted(
    State(state): State<AppState>,
    Json(body): Json<PastedEntryRequest>,
) -> Result<(StatusCode, HeaderMap, Json<EntryResponse>), AppError> {
    let date = body.date.unwrap_or_else(services::today);
    let row = services::save_pasted(&state, date, &body.text).await?;
    Ok(created(row.into()))
}

/// POST /entries/estimated { date?, food }
#[instrument(skip(state, body))]
pub async fn create_estimated(
    State(state): State<AppState>,
    Json(body): Json<EstimatedEntryRequest>,
) -> Result<(StatusCode, HeaderMap, Json<EntryResponse>), AppError> {
    let date = body.date.unwrap_or_else(services::today);
    let row = services::save_estimated(&state, date, &body.food).await?;
    Ok(created(row.into()))
}

fn created(entry: EntryResponse) -> (StatusCode, HeaderMap, Json<EntryResponse>) {
    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/entries/{}", entry.record.date).parse::<HeaderValue>() {
        headers.insert(axum::http::header::LOCATION, location);
    }
    (StatusCode::CREATED, headers, Json(entry))
}
