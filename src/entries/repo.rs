use anyhow::Context;
use sqlx::SqlitePool;
use time::Date;

use super::repo_types::EntryRow;
use crate::nutrition::{aggregate::Averages, NutritionRecord};

const ENTRY_COLUMNS: &str = "id, date, source, calories, protein, carbs, fat, saturated_fat, \
     unsaturated_fat, fiber, sugar, sodium, score, vitamin_highlights, suggestions, feedback, input";

/// Insert the record, or replace every column of the row already stored for its date.
pub async fn upsert(db: &SqlitePool, r: &NutritionRecord) -> anyhow::Result<EntryRow> {
    let sql = format!(
        r#"
        INSERT INTO entries (date, source, calories, protein, carbs, fat, saturated_fat,
                             unsaturated_fat, fiber, sugar, sodium, score,
                             vitamin_highlights, suggestions, feedback, input)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        ON CONFLICT(date) DO UPDATE SET
            source = excluded.source,
            calories = excluded.calories,
            protein = excluded.protein,
            carbs = excluded.carbs,
            fat = excluded.fat,
            saturated_fat = excluded.saturated_fat,
            unsaturated_fat = excluded.unsaturated_fat,
            fiber = excluded.fiber,
            sugar = excluded.sugar,
            sodium = excluded.sodium,
            score = excluded.score,
            vitamin_highlights = excluded.vitamin_highlights,
            suggestions = excluded.suggestions,
            feedback = excluded.feedback,
            input = excluded.input
        RETURNING {ENTRY_COLUMNS}
        "#
    );

    let row = sqlx::query_as::<_, EntryRow>(&sql)
        .bind(r.date)
        .bind(r.source)
        .bind(r.calories)
        .bind(r.protein)
        .bind(r.carbs)
        .bind(r.fat)
        .bind(r.saturated_fat)
        .bind(r.unsaturated_fat)
        .bind(r.fiber)
        .bind(r.sugar)
        .bind(r.sodium)
        .bind(r.score)
        .bind(&r.vitamin_highlights)
        .bind(&r.suggestions)
        .bind(&r.feedback)
        .bind(&r.input)
        .fetch_one(db)
        .await
        .with_context(|| format!("upsert entry for {}", r.date))?;
    Ok(row)
}

/// Every stored day, newest first.
pub async fn list_all(db: &SqlitePool) -> anyhow::Result<Vec<EntryRow>> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries ORDER BY date DESC");
    let rows = sqlx::query_as::<_, EntryRow>(&sql)
        .fetch_all(db)
        .await
        .context("list entries")?;
    Ok(rows)
}

/// Every stored day, oldest first.
pub async fn list_ascending(db: &SqlitePool) -> anyhow::Result<Vec<EntryRow>> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries ORDER BY date ASC");
    let rows = sqlx::query_as::<_, EntryRow>(&sql)
        .fetch_all(db)
        .await
        .context("list entries ascending")?;
    Ok(rows)
}

pub async fn find_by_date(db: &SqlitePool, date: Date) -> anyhow::Result<Option<EntryRow>> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE date = $1");
    let row = sqlx::query_as::<_, EntryRow>(&sql)
        .bind(date)
        .fetch_optional(db)
        .await
        .with_context(|| format!("find entry for {date}"))?;
    Ok(row)
}

/// Per-field means computed by the database, rounded to one decimal.
pub async fn averages(db: &SqlitePool) -> anyhow::Result<Averages> {
    let avg = sqlx::query_as::<_, Averages>(
        r#"
        SELECT COUNT(*)                        AS count,
               ROUND(AVG(calories), 1)         AS avg_calories,
               ROUND(AVG(protein), 1)          AS avg_protein,
               ROUND(AVG(carbs), 1)            AS avg_carbs,
               ROUND(AVG(fat), 1)              AS avg_fat,
               ROUND(AVG(saturated_fat), 1)    AS avg_saturated_fat,
               ROUND(AVG(unsaturated_fat), 1)  AS avg_unsaturated_fat,
               ROUND(AVG(fiber), 1)            AS avg_fiber,
               ROUND(AVG(sugar), 1)            AS avg_sugar,
               ROUND(AVG(sodium), 1)           AS avg_sodium,
               ROUND(AVG(score), 1)            AS avg_score
          FROM entries
        "#,
    )
    .fetch_one(db)
    .await
    .context("average entries")?;
    Ok(avg)
}
