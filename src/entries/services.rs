use time::{Date, OffsetDateTime};
use tracing::{info, warn};

use super::repo;
use super::repo_types::EntryRow;
use crate::error::AppError;
use crate::nutrition::{parser, NutritionRecord};
use crate::state::AppState;

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Parse pasted "Key: value" text and store it as the entry for `date`.
pub async fn save_pasted(st: &AppState, date: Date, text: &str) -> Result<EntryRow, AppError> {
    if text.trim().is_empty() {
        warn!(%date, "pasted entry is empty");
        return Err(AppError::EmptyInput);
    }

    let record = parser::parse_structured(date, text).map_err(|e| {
        warn!(%date, error = %e, "pasted entry rejected");
        e
    })?;

    let row = repo::upsert(&st.db, &record).await?;
    info!(%date, id = row.id, calories = row.calories, score = row.score, "pasted entry saved");
    Ok(row)
}

/// Ask the estimator about `food` and store its answer as the entry for `date`.
pub async fn save_estimated(st: &AppState, date: Date, food: &str) -> Result<EntryRow, AppError> {
    if food.trim().is_empty() {
        warn!(%date, "food description is empty");
        return Err(AppError::EmptyInput);
    }

    let reply = st.estimator.estimate(food).await?;
    let record = parser::parse_estimate(date, food, &reply).map_err(|e| {
        warn!(%date, error = %e, "estimator reply rejected");
        e
    })?;

    let row = repo::upsert(&st.db, &record).await?;
    info!(%date, id = row.id, calories = row.calories, score = row.score, "estimated entry saved");
    Ok(row)
}

/// Full history, oldest first, ready for aggregation.
pub async fn history(st: &AppState) -> Result<Vec<NutritionRecord>, AppError> {
    let rows = repo::list_ascending(&st.db).await?;
    Ok(rows.into_iter().map(NutritionRecord::from).collect())
}
