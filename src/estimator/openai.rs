use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use super::{prompt_for, Estimator, EstimatorError};
use crate::config::EstimatorConfig;

const TEMPERATURE: f32 = 0.5;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Chat-completions client for any OpenAI-compatible endpoint.
pub struct OpenAiEstimator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiEstimator {
    /// A stalled endpoint fails with `EstimatorError::Request` once `timeout` elapses.
    pub fn new(api_key: String, base_url: String, model: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                error!(error = %e, "failed to build estimator HTTP client, using defaults");
                Client::new()
            });
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    /// `None` when no API key is configured.
    pub fn from_config(cfg: &EstimatorConfig) -> Option<Self> {
        cfg.api_key.as_ref().map(|key| {
            Self::new(
                key.clone(),
                cfg.base_url.clone(),
                cfg.model.clone(),
                Duration::from_secs(cfg.timeout_secs),
            )
        })
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn api_error(status: reqwest::StatusCode, body: &str) -> EstimatorError {
        let message = match serde_json::from_str::<ApiErrorResponse>(body) {
            Ok(e) => e.error.message,
            Err(_) => body.chars().take(200).collect(),
        };
        EstimatorError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl Estimator for OpenAiEstimator {
    #[instrument(skip(self, food), fields(model = %self.model))]
    async fn estimate(&self, food: &str) -> Result<String, EstimatorError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".into(),
                content: prompt_for(food),
            }],
            temperature: TEMPERATURE,
        };

        debug!("sending chat completion request");
        let response = self
            .client
            .post(self.url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "estimator request failed");
                EstimatorError::Request(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EstimatorError::Request(e.to_string()))?;

        if !status.is_success() {
            error!(%status, "estimator returned an error");
            return Err(Self::api_error(status, &body));
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| EstimatorError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(EstimatorError::EmptyReply)
    }
}
