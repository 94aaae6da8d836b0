use crate::config::AppConfig;
use crate::estimator::{DisabledEstimator, Estimator, OpenAiEstimator};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub estimator: Arc<dyn Estimator>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = crate::db::connect(&config).await?;

        let estimator = match OpenAiEstimator::from_config(&config.estimator) {
            Some(e) => Arc::new(e) as Arc<dyn Estimator>,
            None => {
                tracing::warn!("OPENAI_API_KEY not set; estimated entries are disabled");
                Arc::new(DisabledEstimator) as Arc<dyn Estimator>
            }
        };

        Ok(Self::from_parts(db, config, estimator))
    }

    pub fn from_parts(db: SqlitePool, config: Arc<AppConfig>, estimator: Arc<dyn Estimator>) -> Self {
        Self {
            db,
            config,
            estimator,
        }
    }

    /// In-memory database plus an estimator that always answers `reply`.
    #[cfg(test)]
    pub async fn fake(reply: &str) -> Self {
        use crate::config::EstimatorConfig;
        use crate::estimator::EstimatorError;
        use async_trait::async_trait;

        struct FakeEstimator(String);
        #[async_trait]
        impl Estimator for FakeEstimator {
            async fn estimate(&self, _food: &str) -> Result<String, EstimatorError> {
                Ok(self.0.clone())
            }
        }

        let config = Arc::new(AppConfig {
            database_url: "sqlite::memory:".into(),
            max_connections: 1,
            host: "127.0.0.1".into(),
            port: 0,
            estimator: EstimatorConfig {
                api_key: None,
                base_url: "http://fake.local".into(),
                model: "fake".into(),
                timeout_secs: 1,
            },
        });

        let db = crate::db::memory().await;
        Self::from_parts(db, config, Arc::new(FakeEstimator(reply.to_string())))
    }
}
