use serde::Serialize;
use time::Date;

use super::record::NutritionRecord;

/// Mean of every numeric field over the whole history, one decimal place.
///
/// Every mean is `None` when there is no history.
#[derive(Debug, Clone, Default, Serialize, PartialEq, sqlx::FromRow)]
pub struct Averages {
    pub count: i64,
    pub avg_calories: Option<f64>,
    pub avg_protein: Option<f64>,
    pub avg_carbs: Option<f64>,
    pub avg_fat: Option<f64>,
    pub avg_saturated_fat: Option<f64>,
    pub avg_unsaturated_fat: Option<f64>,
    pub avg_fiber: Option<f64>,
    pub avg_sugar: Option<f64>,
    pub avg_sodium: Option<f64>,
    pub avg_score: Option<f64>,
}

/// Expanding-window means at one day of the history.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunningMean {
    pub date: Date,
    pub score: f64,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Trend {
    pub points: Vec<RunningMean>,
    pub latest: Option<RunningMean>,
    pub averages: Averages,
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn mean_of(records: &[NutritionRecord], f: impl Fn(&NutritionRecord) -> f64) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let sum: f64 = records.iter().map(f).sum();
    Some(round1(sum / records.len() as f64))
}

pub fn averages(records: &[NutritionRecord]) -> Averages {
    Averages {
        count: records.len() as i64,
        avg_calories: mean_of(records, |r| r.calories as f64),
        avg_protein: mean_of(records, |r| r.protein as f64),
        avg_carbs: mean_of(records, |r| r.carbs as f64),
        avg_fat: mean_of(records, |r| r.fat as f64),
        avg_saturated_fat: mean_of(records, |r| r.saturated_fat as f64),
        avg_unsaturated_fat: mean_of(records, |r| r.unsaturated_fat as f64),
        avg_fiber: mean_of(records, |r| r.fiber as f64),
        avg_sugar: mean_of(records, |r| r.sugar as f64),
        avg_sodium: mean_of(records, |r| r.sodium as f64),
        avg_score: mean_of(records, |r| r.score),
    }
}

/// Running means in date order. Input order does not matter.
pub fn running_means(records: &[NutritionRecord]) -> Vec<RunningMean> {
    let mut sorted: Vec<&NutritionRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.date);

    let (mut score, mut calories, mut protein, mut carbs, mut fat) = (0.0, 0.0, 0.0, 0.0, 0.0);
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, r)| {
            score += r.score;
            calories += r.calories as f64;
            protein += r.protein as f64;
            carbs += r.carbs as f64;
            fat += r.fat as f64;
            let n = (i + 1) as f64;
            RunningMean {
                date: r.date,
                score: score / n,
                calories: calories / n,
                protein: protein / n,
                carbs: carbs / n,
                fat: fat / n,
            }
        })
        .collect()
}

pub fn trend(records: &[NutritionRecord]) -> Trend {
    let points = running_means(records);
    let latest = points.last().cloned();
    Trend {
        points,
        latest,
        averages: averages(records),
    }
}
