use sqlx::FromRow;
use time::Date;

use crate::nutrition::{EntrySource, NutritionRecord};

#[derive(Debug, FromRow)]
pub struct EntryRow {
    pub id: i64,
    pub date: Date,
    pub source: EntrySource,
    pub calories: i64,
    pub protein: i64,
    pub carbs: i64,
    pub fat: i64,
    pub saturated_fat: i64,
    pub unsaturated_fat: i64,
    pub fiber: i64,
    pub sugar: i64,
    pub sodium: i64,
    pub score: f64,
    pub vitamin_highlights: String,
    pub suggestions: String,
    pub feedback: String,
    pub input: String,
}

impl From<EntryRow> for NutritionRecord {
    fn from(r: EntryRow) -> Self {
        Self {
            date: r.date,
            source: r.source,
            calories: r.calories,
            protein: r.protein,
            carbs: r.carbs,
            fat: r.fat,
            saturated_fat: r.saturated_fat,
            unsaturated_fat: r.unsaturated_fat,
            fiber: r.fiber,
            sugar: r.sugar,
            sodium: r.sodium,
            score: r.score,
            vitamin_highlights: r.vitamin_highlights,
            suggestions: r.suggestions,
            feedback: r.feedback,
            input: r.input,
        }
    }
}
