use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use time::Date;

/// Where a day's numbers came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum EntrySource {
    /// Structured "Key: value" text pasted by the user.
    Pasted,
    /// Free-text description run through the external estimator.
    Estimated,
}

/// One day of nutrition, keyed by `date`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NutritionRecord {
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

/// Starting point offered to users for the pasted format.
pub const TEMPLATE: &str = "\
Calories: 1450
Protein: 75g
Carbs: 140g
Fat: 50g
Saturated Fat: 14g
Unsaturated Fat: 36g
Fiber: 10g
Sugar: 24g
Sodium: 1350mg
Score: 8/10
Vitamin Highlights:
- Good source of Calcium and Vitamin B12 from yogurt and cheese
- Moderate Magnesium from nuts
Suggestions:
- Add some vegetables for micronutrients and fiber
- Slightly reduce sodium intake by choosing lower sodium deli meats";

impl NutritionRecord {
    /// All-zero record for `date`; the parser fills in what it finds.
    pub fn empty(date: Date, source: EntrySource) -> Self {
        Self {
            date,
            source,
            calories: 0,
            protein: 0,
            carbs: 0,
            fat: 0,
            saturated_fat: 0,
            unsaturated_fat: 0,
            fiber: 0,
            sugar: 0,
            sodium: 0,
            score: 0.0,
            vitamin_highlights: String::new(),
            suggestions: String::new(),
            feedback: String::new(),
            input: String::new(),
        }
    }

    /// Render the record back into the pasted "Key: value" format.
    ///
    /// `date`, `source` and `input` are not part of that format and are left out.
    pub fn to_structured_text(&self) -> String {
        let mut map = Mapping::new();
        let mut put = |key: &str, value: Value| {
            map.insert(Value::from(key), value);
        };

        put("Calories", Value::from(self.calories));
        put("Protein", grams(self.protein));
        put("Carbs", grams(self.carbs));
        put("Fat", grams(self.fat));
        put("Saturated Fat", grams(self.saturated_fat));
        put("Unsaturated Fat", grams(self.unsaturated_fat));
        put("Fiber", grams(self.fiber));
        put("Sugar", grams(self.sugar));
        put("Sodium", Value::from(format!("{}mg", self.sodium)));
        put("Score", Value::from(format!("{}/10", self.score)));
        put("Vitamin Highlights", bullets(&self.vitamin_highlights, "\n"));
        put("Suggestions", bullets(&self.suggestions, "; "));
        if !self.feedback.is_empty() {
            put("Feedback", Value::from(self.feedback.clone()));
        }

        // A mapping of strings and numbers always serializes.
        serde_yaml::to_string(&map).unwrap_or_default()
    }
}

fn grams(v: i64) -> Value {
    Value::from(format!("{v}g"))
}

fn bullets(joined: &str, sep: &str) -> Value {
    if joined.is_empty() {
        return Value::Sequence(Vec::new());
    }
    Value::Sequence(joined.split(sep).map(Value::from).collect())
}
