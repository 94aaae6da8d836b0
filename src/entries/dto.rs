use serde::{Deserialize, Serialize};
use time::Date;

use super::repo_types::EntryRow;
use crate::nutrition::NutritionRecord;

#[derive(Debug, Deserialize)]
pub struct PastedEntryRequest {
    #[serde(default)]
    pub date: Option<Date>, // defaults to today (UTC)
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct EstimatedEntryRequest {
    #[serde(default)]
    pub date: Option<Date>,
    pub food: String,
}

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub id: i64,
    #[serde(flatten)]
    pub record: NutritionRecord,
}

impl From<EntryRow> for EntryResponse {
    fn from(row: EntryRow) -> Self {
        Self {
            id: row.id,
            record: row.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    pub template: &'static str,
}
