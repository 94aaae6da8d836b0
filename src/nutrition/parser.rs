use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use time::Date;

use super::record::{EntrySource, NutritionRecord};
use crate::estimator::EstimatorError;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("could not read structured text: {0}")]
    Syntax(String),
    #[error("expected `Key: value` lines at the top level")]
    NotAMapping,
    #[error("{field} has a non-numeric value `{value}`")]
    InvalidNumber { field: &'static str, value: String },
    #[error("`{0}` is given more than once")]
    DuplicateField(String),
}

/// How strictly quantities are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quantities {
    /// Whole numbers only, as typed by a person.
    Whole,
    /// Decimals are rounded; estimators answer with floats.
    Rounded,
}

const CALORIES: &str = "Calories";
const PROTEIN: &str = "Protein";
const CARBS: &str = "Carbs";
const FAT: &str = "Fat";
const SATURATED_FAT: &str = "Saturated Fat";
const UNSATURATED_FAT: &str = "Unsaturated Fat";
const FIBER: &str = "Fiber";
const SUGAR: &str = "Sugar";
const SODIUM: &str = "Sodium";
const SCORE: &str = "Score";
const VITAMIN_HIGHLIGHTS: &str = "Vitamin Highlights";
const SUGGESTIONS: &str = "Suggestions";
const FEEDBACK: &str = "Feedback";

/// Keys the estimator is asked to return; a reply without one of them is rejected.
const ESTIMATE_REQUIRED: [&str; 7] = [CALORIES, PROTEIN, CARBS, FAT, FIBER, SCORE, FEEDBACK];

#[derive(Debug, Clone, PartialEq)]
enum FieldValue {
    Text(String),
    List(Vec<String>),
}

/// Flat view of a parsed document, keyed by normalized field name.
#[derive(Debug, Default)]
struct Fields {
    values: HashMap<String, FieldValue>,
    seen: HashSet<String>,
}

impl Fields {
    fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(&normalize_key(name))
    }

    /// Keys that normalize to the same name (`Fat` and `fat`) are rejected,
    /// even when one of them is empty.
    fn insert(&mut self, raw_key: &str, value: Option<FieldValue>) -> Result<(), ParseError> {
        let key = normalize_key(raw_key);
        if !self.seen.insert(key.clone()) {
            return Err(ParseError::DuplicateField(raw_key.to_string()));
        }
        if let Some(v) = value {
            self.values.insert(key, v);
        }
        Ok(())
    }

    fn from_yaml(map: serde_yaml::Mapping) -> Result<Self, ParseError> {
        let mut out = Self::default();
        for (k, v) in map {
            let value = match v {
                serde_yaml::Value::Null => None,
                serde_yaml::Value::Sequence(items) => {
                    Some(FieldValue::List(items.iter().map(yaml_text).collect()))
                }
                other => Some(FieldValue::Text(yaml_text(&other))),
            };
            out.insert(&yaml_text(&k), value)?;
        }
        Ok(out)
    }

    fn from_json(map: serde_json::Map<String, serde_json::Value>) -> Result<Self, ParseError> {
        let mut out = Self::default();
        for (k, v) in map {
            let value = match v {
                serde_json::Value::Null => None,
                serde_json::Value::Array(items) => {
                    Some(FieldValue::List(items.iter().map(json_text).collect()))
                }
                other => Some(FieldValue::Text(json_text(&other))),
            };
            out.insert(&k, value)?;
        }
        Ok(out)
    }
}

/// `Saturated Fat`, `saturated_fat` and `SATURATED-FAT` all name the same field.
fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn yaml_text(v: &serde_yaml::Value) -> String {
    use serde_yaml::Value;
    match v {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Sequence(items) => items.iter().map(yaml_text).collect::<Vec<_>>().join(", "),
        // `- Tip: eat more greens` reads as a one-entry mapping.
        Value::Mapping(m) => m
            .iter()
            .map(|(k, v)| format!("{}: {}", yaml_text(k), yaml_text(v)))
            .collect::<Vec<_>>()
            .join(", "),
        Value::Tagged(t) => yaml_text(&t.value),
    }
}

fn json_text(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Integer from text such as `75g`, `1350 mg` or `1450kcal`.
///
/// Values that do not fit an `i64` are rejected, never clamped.
fn coerce_int(field: &'static str, raw: &str, mode: Quantities) -> Result<i64, ParseError> {
    lazy_static! {
        static ref QUANTITY_RE: Regex =
            Regex::new(r"(?i)^(-?\d+)(\.\d+)?\s*(?:kcal|mg|g)?$").unwrap();
    }
    let invalid = || ParseError::InvalidNumber {
        field,
        value: raw.to_string(),
    };
    let caps = QUANTITY_RE.captures(raw.trim()).ok_or_else(|| invalid())?;
    match (caps.get(2), mode) {
        (None, _) => caps[1].parse::<i64>().map_err(|_| invalid()),
        (Some(_), Quantities::Whole) => Err(invalid()),
        (Some(frac), Quantities::Rounded) => {
            let n: f64 = format!("{}{}", &caps[1], frac.as_str())
                .parse()
                .map_err(|_| invalid())?;
            let n = n.round();
            // i64::MAX as f64 rounds up to 2^63, which is already out of range
            if n >= i64::MIN as f64 && n < i64::MAX as f64 {
                Ok(n as i64)
            } else {
                Err(invalid())
            }
        }
    }
}

/// Numerator of `8/10`, or the bare number.
fn coerce_score(raw: &str) -> Result<f64, ParseError> {
    let head = raw.split('/').next().unwrap_or_default().trim();
    match head.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseError::InvalidNumber {
            field: SCORE,
            value: raw.to_string(),
        }),
    }
}

fn int_field(fields: &Fields, name: &'static str, mode: Quantities) -> Result<i64, ParseError> {
    match fields.get(name) {
        None => Ok(0),
        Some(FieldValue::Text(s)) => coerce_int(name, s, mode),
        Some(FieldValue::List(items)) => Err(ParseError::InvalidNumber {
            field: name,
            value: items.join(", "),
        }),
    }
}

fn score_field(fields: &Fields) -> Result<f64, ParseError> {
    match fields.get(SCORE) {
        None => Ok(0.0),
        Some(FieldValue::Text(s)) => coerce_score(s),
        Some(FieldValue::List(items)) => Err(ParseError::InvalidNumber {
            field: SCORE,
            value: items.join(", "),
        }),
    }
}

fn text_field(fields: &Fields, name: &str, sep: &str) -> String {
    match fields.get(name) {
        None => String::new(),
        Some(FieldValue::Text(s)) => s.trim().to_string(),
        Some(FieldValue::List(items)) => items.join(sep),
    }
}

fn fill(record: &mut NutritionRecord, fields: &Fields, mode: Quantities) -> Result<(), ParseError> {
    record.calories = int_field(fields, CALORIES, mode)?;
    record.protein = int_field(fields, PROTEIN, mode)?;
    record.carbs = int_field(fields, CARBS, mode)?;
    record.fat = int_field(fields, FAT, mode)?;
    record.saturated_fat = int_field(fields, SATURATED_FAT, mode)?;
    record.unsaturated_fat = int_field(fields, UNSATURATED_FAT, mode)?;
    record.fiber = int_field(fields, FIBER, mode)?;
    record.sugar = int_field(fields, SUGAR, mode)?;
    record.sodium = int_field(fields, SODIUM, mode)?;
    record.score = score_field(fields)?;
    record.vitamin_highlights = text_field(fields, VITAMIN_HIGHLIGHTS, "\n");
    record.suggestions = text_field(fields, SUGGESTIONS, "; ");
    record.feedback = text_field(fields, FEEDBACK, " ");
    Ok(())
}

/// Parse a pasted "Key: value" block into a record for `date`.
///
/// Absent fields default to zero or empty. A field that is present but not
/// a whole number (after stripping its unit) fails the whole parse.
pub fn parse_structured(date: Date, text: &str) -> Result<NutritionRecord, ParseError> {
    let doc: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| ParseError::Syntax(e.to_string()))?;
    let serde_yaml::Value::Mapping(map) = doc else {
        return Err(ParseError::NotAMapping);
    };

    let fields = Fields::from_yaml(map)?;
    let mut record = NutritionRecord::empty(date, EntrySource::Pasted);
    fill(&mut record, &fields, Quantities::Whole)?;
    Ok(record)
}

/// Parse the estimator's reply for the food description `food`.
///
/// The reply must be a JSON object, optionally wrapped in a Markdown code fence.
/// It is never evaluated.
pub fn parse_estimate(date: Date, food: &str, reply: &str) -> Result<NutritionRecord, EstimatorError> {
    let body = strip_code_fence(reply);
    if body.is_empty() {
        return Err(EstimatorError::EmptyReply);
    }
    let doc: serde_json::Value =
        serde_json::from_str(body).map_err(|e| EstimatorError::Malformed(e.to_string()))?;
    let serde_json::Value::Object(map) = doc else {
        return Err(EstimatorError::Malformed("top-level value is not an object".into()));
    };

    let fields = Fields::from_json(map)?;
    if let Some(missing) = ESTIMATE_REQUIRED.iter().find(|k| fields.get(k).is_none()) {
        return Err(EstimatorError::MissingField(*missing));
    }

    let mut record = NutritionRecord::empty(date, EntrySource::Estimated);
    fill(&mut record, &fields, Quantities::Rounded)?;
    record.input = food.trim().to_string();
    Ok(record)
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string (`json`) up to the first newline
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod parser_tests {
    use super::*;
    use time::macros::date;

    const DAY: Date = date!(2024 - 01 - 01);

    #[test]
    fn parses_the_documented_example() {
        let text = "Calories: 1450\nProtein: 75g\nCarbs: 140g\nFat: 50g\nScore: 8/10\nSuggestions:\n- Add vegetables";
        let r = parse_structured(DAY, text).unwrap();
        assert_eq!(r.date, DAY);
        assert_eq!(r.source, EntrySource::Pasted);
        assert_eq!(r.calories, 1450);
        assert_eq!(r.protein, 75);
        assert_eq!(r.carbs, 140);
        assert_eq!(r.fat, 50);
        assert_eq!(r.score, 8.0);
        assert_eq!(r.suggestions, "Add vegetables");
        assert_eq!(r.sodium, 0);
        assert_eq!(r.vitamin_highlights, "");
        assert_eq!(r.input, "");
    }

    #[test]
    fn parses_the_full_template() {
        let r = parse_structured(DAY, crate::nutrition::TEMPLATE).unwrap();
        assert_eq!(r.saturated_fat, 14);
        assert_eq!(r.unsaturated_fat, 36);
        assert_eq!(r.fiber, 10);
        assert_eq!(r.sugar, 24);
        assert_eq!(r.sodium, 1350);
        assert_eq!(
            r.vitamin_highlights,
            "Good source of Calcium and Vitamin B12 from yogurt and cheese\nModerate Magnesium from nuts"
        );
        assert_eq!(
            r.suggestions,
            "Add some vegetables for micronutrients and fiber; Slightly reduce sodium intake by choosing lower sodium deli meats"
        );
    }

    #[test]
    fn missing_fields_default_to_zero_and_empty() {
        let r = parse_structured(DAY, "Protein: 30g\nScore: 6").unwrap();
        assert_eq!(r.protein, 30);
        assert_eq!(r.score, 6.0);
        assert_eq!(r.calories, 0);
        assert_eq!(r.carbs, 0);
        assert_eq!(r.fat, 0);
        assert_eq!(r.fiber, 0);
        assert_eq!(r.suggestions, "");
        assert_eq!(r.vitamin_highlights, "");
    }

    #[test]
    fn present_but_non_numeric_fails() {
        let err = parse_structured(DAY, "Calories: lots\nProtein: 75g").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidNumber {
                field: "Calories",
                value: "lots".into()
            }
        );
        assert!(err.to_string().contains("Calories"));
    }

    #[test]
    fn bad_score_fails() {
        let err = parse_structured(DAY, "Score: great/10").unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { field: "Score", .. }));
    }

    #[test]
    fn unit_suffixes_are_stripped() {
        let r = parse_structured(DAY, "Calories: 1450kcal\nSodium: 1350 mg\nFat: 12g").unwrap();
        assert_eq!(r.calories, 1450);
        assert_eq!(r.sodium, 1350);
        assert_eq!(r.fat, 12);
    }

    #[test]
    fn pasted_decimals_are_rejected() {
        let err = parse_structured(DAY, "Fat: 12.6g").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidNumber {
                field: "Fat",
                value: "12.6g".into()
            }
        );

        let err = parse_structured(DAY, "Calories: 1e3").unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { field: "Calories", .. }));
    }

    #[test]
    fn oversized_quantity_fails_instead_of_clamping() {
        let err = parse_structured(DAY, "Calories: 99999999999999999999g").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidNumber {
                field: "Calories",
                value: "99999999999999999999g".into()
            }
        );
        let r = parse_structured(DAY, "Sodium: 9223372036854775807mg").unwrap();
        assert_eq!(r.sodium, i64::MAX);
    }

    #[test]
    fn repeated_field_is_rejected() {
        let err = parse_structured(DAY, "Fat: 5\nfat: 9").unwrap_err();
        assert_eq!(err, ParseError::DuplicateField("fat".into()));

        let err = parse_structured(DAY, "Saturated Fat: 5g\nsaturated_fat:").unwrap_err();
        assert!(matches!(err, ParseError::DuplicateField(_)));
    }

    #[test]
    fn unknown_units_are_rejected() {
        let err = parse_structured(DAY, "Protein: 3oz").unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { field: "Protein", .. }));
    }

    #[test]
    fn list_fields_accept_single_strings() {
        let r = parse_structured(DAY, "Suggestions: Eat fruit\nVitamin Highlights: Vitamin C").unwrap();
        assert_eq!(r.suggestions, "Eat fruit");
        assert_eq!(r.vitamin_highlights, "Vitamin C");
    }

    #[test]
    fn keys_match_loosely() {
        let r = parse_structured(DAY, "saturated_fat: 9g\nCALORIES: 900").unwrap();
        assert_eq!(r.saturated_fat, 9);
        assert_eq!(r.calories, 900);
    }

    #[test]
    fn empty_value_counts_as_absent() {
        let r = parse_structured(DAY, "Calories:\nProtein: 20g").unwrap();
        assert_eq!(r.calories, 0);
        assert_eq!(r.protein, 20);
    }

    #[test]
    fn plain_prose_is_not_a_mapping() {
        assert_eq!(
            parse_structured(DAY, "just some chicken and rice").unwrap_err(),
            ParseError::NotAMapping
        );
    }

    #[test]
    fn broken_yaml_is_a_syntax_error() {
        let err = parse_structured(DAY, "Calories: [1450\nProtein: 75g").unwrap_err();
        assert!(matches!(err, ParseError::Syntax(_)));
    }

    #[test]
    fn reserialized_text_parses_to_the_same_record() {
        let original = parse_structured(DAY, crate::nutrition::TEMPLATE).unwrap();
        let again = parse_structured(DAY, &original.to_structured_text()).unwrap();
        assert_eq!(original, again);

        let sparse = parse_structured(DAY, "Protein: 30g\nScore: 6.5/10\nFeedback: Solid day").unwrap();
        let again = parse_structured(DAY, &sparse.to_structured_text()).unwrap();
        assert_eq!(sparse, again);
    }

    #[test]
    fn estimate_reply_is_parsed_strictly() {
        let reply = r#"{"calories": 2100, "protein": "95g", "carbs": 230, "fat": 70,
                        "fiber": 18, "score": 7, "feedback": "Good protein, low veg."}"#;
        let r = parse_estimate(DAY, "  eggs, chicken, rice  ", reply).unwrap();
        assert_eq!(r.source, EntrySource::Estimated);
        assert_eq!(r.calories, 2100);
        assert_eq!(r.protein, 95);
        assert_eq!(r.fiber, 18);
        assert_eq!(r.score, 7.0);
        assert_eq!(r.feedback, "Good protein, low veg.");
        assert_eq!(r.input, "eggs, chicken, rice");
    }

    #[test]
    fn estimate_reply_in_code_fence_is_accepted() {
        let reply = "```json\n{\"calories\": 1800, \"protein\": 80, \"carbs\": 200, \"fat\": 60, \"fiber\": 25, \"score\": \"8/10\", \"feedback\": \"ok\"}\n```";
        let r = parse_estimate(DAY, "salad", reply).unwrap();
        assert_eq!(r.calories, 1800);
        assert_eq!(r.score, 8.0);
    }

    #[test]
    fn estimate_reply_that_is_not_json_is_rejected() {
        let reply = "{'calories': 1800, 'protein': __import__('os').getpid()}";
        let err = parse_estimate(DAY, "salad", reply).unwrap_err();
        assert!(matches!(err, EstimatorError::Malformed(_)));

        let err = parse_estimate(DAY, "salad", "[1, 2, 3]").unwrap_err();
        assert!(matches!(err, EstimatorError::Malformed(_)));

        let err = parse_estimate(DAY, "salad", "   ").unwrap_err();
        assert!(matches!(err, EstimatorError::EmptyReply));
    }

    #[test]
    fn estimate_reply_missing_a_field_is_rejected() {
        let reply = r#"{"calories": 1800, "protein": 80, "carbs": 200, "fat": 60, "score": 8, "feedback": "ok"}"#;
        let err = parse_estimate(DAY, "salad", reply).unwrap_err();
        assert!(matches!(err, EstimatorError::MissingField("Fiber")));
    }

    #[test]
    fn estimate_reply_decimals_are_rounded_within_range() {
        let reply = r#"{"calories": 1850.6, "protein": "80.4g", "carbs": 200, "fat": 60, "fiber": 5, "score": 7.5, "feedback": "ok"}"#;
        let r = parse_estimate(DAY, "salad", reply).unwrap();
        assert_eq!(r.calories, 1851);
        assert_eq!(r.protein, 80);
        assert_eq!(r.score, 7.5);

        let reply = r#"{"calories": 1e30, "protein": 80, "carbs": 200, "fat": 60, "fiber": 5, "score": 7, "feedback": "ok"}"#;
        let err = parse_estimate(DAY, "salad", reply).unwrap_err();
        assert!(matches!(
            err,
            EstimatorError::Field(ParseError::InvalidNumber { field: "Calories", .. })
        ));
    }

    #[test]
    fn estimate_reply_with_repeated_key_is_rejected() {
        let reply = r#"{"calories": 1800, "Calories": 900, "protein": 80, "carbs": 200, "fat": 60, "fiber": 5, "score": 7, "feedback": "ok"}"#;
        let err = parse_estimate(DAY, "salad", reply).unwrap_err();
        assert!(matches!(err, EstimatorError::Field(ParseError::DuplicateField(_))));
    }

    #[test]
    fn estimate_reply_with_bad_number_is_rejected() {
        let reply = r#"{"calories": "a lot", "protein": 80, "carbs": 200, "fat": 60, "fiber": 5, "score": 8, "feedback": "ok"}"#;
        let err = parse_estimate(DAY, "salad", reply).unwrap_err();
        assert!(matches!(
            err,
            EstimatorError::Field(ParseError::InvalidNumber { field: "Calories", .. })
        ));
    }
}
