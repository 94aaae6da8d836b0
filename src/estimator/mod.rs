mod openai;

use async_trait::async_trait;
use thiserror::Error;

use crate::nutrition::parser::ParseError;

pub use openai::OpenAiEstimator;

#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error("no estimator configured; set OPENAI_API_KEY")]
    NotConfigured,
    #[error("estimator request failed: {0}")]
    Request(String),
    #[error("estimator returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("estimator returned an empty reply")]
    EmptyReply,
    #[error("estimator reply is not a JSON object: {0}")]
    Malformed(String),
    #[error("estimator reply is missing `{0}`")]
    MissingField(&'static str),
    #[error("estimator reply has a bad field: {0}")]
    Field(#[from] ParseError),
}

/// Turns a free-text food description into a raw reply that
/// [`crate::nutrition::parser::parse_estimate`] can read.
#[async_trait]
pub trait Estimator: Send + Sync {
    async fn estimate(&self, food: &str) -> Result<String, EstimatorError>;
}

/// Stands in when no API key is configured.
pub struct DisabledEstimator;

#[async_trait]
impl Estimator for DisabledEstimator {
    async fn estimate(&self, _food: &str) -> Result<String, EstimatorError> {
        Err(EstimatorError::NotConfigured)
    }
}

pub(crate) fn prompt_for(food: &str) -> String {
    format!(
        r#"Here is what I ate today: {food}

Please estimate:
- Total calories
- Macronutrients (protein, fat, carbs, fiber)
- Health score from 1 to 10
- Short feedback on diet quality

Return only a JSON object in this format:
{{
  "calories": ...,
  "protein": ...,
  "carbs": ...,
  "fat": ...,
  "fiber": ...,
  "score": ...,
  "feedback": "..."
}}"#
    )
}
