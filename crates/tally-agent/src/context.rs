use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use crate::errors::ToolError;

/// Quote source for currency pairs.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn quote(&self, base_currency: &str, target_currency: &str) -> Result<f64, ToolError>;
}

/// Fetches rates from an exchange-rate JSON API
/// (`GET {base_url}/{BASE}` returning `{"rates": {"KRW": 1390.0, ...}}`).
pub struct HttpRateSource {
    base_url: String,
    http: reqwest::Client,
}

pub const DEFAULT_RATE_API_BASE_URL: &str = "https://open.er-api.com/v6/latest";

impl HttpRateSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for HttpRateSource {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_API_BASE_URL)
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    async fn quote(&self, base_currency: &str, target_currency: &str) -> Result<f64, ToolError> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            base_currency.to_ascii_uppercase()
        );
        let body: Value = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|error| ToolError::Execution(error.to_string()))?
            .json()
            .await
            .map_err(|error| ToolError::Execution(error.to_string()))?;

        body.get("rates")
            .and_then(|rates| rates.get(target_currency.to_ascii_uppercase()))
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                ToolError::Execution(format!(
                    "no rate available for {}/{}",
                    base_currency.to_ascii_uppercase(),
                    target_currency.to_ascii_uppercase()
                ))
            })
    }
}

/// Fixed-rate source for tests and offline runs.
#[derive(Default)]
pub struct StaticRateSource {
    rates: Mutex<HashMap<(String, String), f64>>,
}

impl StaticRateSource {
    pub fn with_rate(self, base: &str, target: &str, rate: f64) -> Self {
        self.rates
            .lock()
            .expect("static rate source mutex poisoned")
            .insert((base.to_uppercase(), target.to_uppercase()), rate);
        self
    }
}

#[async_trait]
impl RateSource for StaticRateSource {
    async fn quote(&self, base_currency: &str, target_currency: &str) -> Result<f64, ToolError> {
        let key = (
            base_currency.to_uppercase(),
            target_currency.to_uppercase(),
        );
        self.rates
            .lock()
            .expect("static rate source mutex poisoned")
            .get(&key)
            .copied()
            .ok_or_else(|| ToolError::Execution(format!("no rate for {}/{}", key.0, key.1)))
    }
}

/// Shared environment handed to every tool executor.
pub struct ToolContext {
    rate_source: Box<dyn RateSource>,
    data_dir: PathBuf,
}

impl ToolContext {
    pub fn new(rate_source: Box<dyn RateSource>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            rate_source,
            data_dir: data_dir.into(),
        }
    }

    pub fn rate_source(&self) -> &dyn RateSource {
        self.rate_source.as_ref()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
