use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct EstimatorConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Whole-request timeout for estimator calls.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub estimator: EstimatorConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = get("DATABASE_URL")
            .unwrap_or_else(|| "sqlite://nutrition_log.db?mode=rwc".into());
        let max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse::<u32>()?,
            None => 5,
        };
        let port = match get("APP_PORT") {
            Some(v) => v.parse::<u16>()?,
            None => 8080,
        };
        let timeout_secs = match get("OPENAI_TIMEOUT_SECS") {
            Some(v) => v.parse::<u64>()?,
            None => 30,
        };
        let estimator = EstimatorConfig {
            api_key: get("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()),
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com/v1".into()),
            model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".into()),
            timeout_secs,
        };
        Ok(Self {
            database_url,
            max_connections,
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            estimator,
        })
    }
}
