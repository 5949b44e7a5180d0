use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDate;
use once_cell::sync::OnceCell;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::register_toolbelt;
use crate::schemas::{str_arg, ToolError};

pub const DEFAULT_API_URL: &str = "https://api.frankfurter.app";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct ExchangeRateConfig {
    pub api_url: String,
    pub timeout: Duration,
    pub max_attempts: u32,
    /// Delay after failed attempt `n` is `backoff_base * 2^n`.
    pub backoff_base: Duration,
}

impl Default for ExchangeRateConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_attempts: MAX_ATTEMPTS,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl ExchangeRateConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("EXCHANGE_API_URL") {
            if !url.trim().is_empty() {
                config.api_url = url.trim().to_string();
            }
        }

        if let Ok(raw) = std::env::var("EXCHANGE_MAX_ATTEMPTS") {
            match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => config.max_attempts = n,
                _ => warn!(value = %raw, "Ignoring invalid EXCHANGE_MAX_ATTEMPTS"),
            }
        }

        config
    }
}

/// Uniform failure once every attempt has failed.
#[derive(Error, Debug)]
pub enum ExchangeRateError {
    #[error("Failed to retrieve exchange rate data")]
    Unavailable {
        attempts: u32,
        #[source]
        last: AttemptError,
    },
}

#[derive(Error, Debug)]
pub enum AttemptError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed payload: no rate for {0}")]
    MissingRate(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateQuery {
    pub from: String,
    pub to: String,
    pub date: String,
}

impl RateQuery {
    pub fn new(from: &str, to: &str, date: &str) -> Result<Self, ToolError> {
        Ok(Self {
            from: currency_code(from)?,
            to: currency_code(to)?,
            date: rate_date(date)?,
        })
    }

    pub fn from_args(args: &Value) -> Result<Self, ToolError> {
        Self::new(
            str_arg(args, "currency_from", "USD")?,
            str_arg(args, "currency_to", "EUR")?,
            str_arg(args, "currency_date", "latest")?,
        )
    }
}

fn currency_code(raw: &str) -> Result<String, ToolError> {
    let code = raw.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ToolError::InvalidArguments(format!(
            "'{}' is not a 3-letter ISO currency code",
            raw
        )));
    }
    Ok(code.to_ascii_uppercase())
}

fn rate_date(raw: &str) -> Result<String, ToolError> {
    let date = raw.trim();
    if date.eq_ignore_ascii_case("latest") {
        return Ok("latest".to_string());
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| {
            ToolError::InvalidArguments(format!("'{}' is not 'latest' or a YYYY-MM-DD date", raw))
        })
}

/// Frankfurter exchange-rate lookups.
pub struct ExchangeRate {
    config: ExchangeRateConfig,
    client: OnceCell<reqwest::Client>,
}

impl Default for ExchangeRate {
    fn default() -> Self {
        Self::with_config(ExchangeRateConfig::from_env())
    }
}

register_toolbelt! {
    ExchangeRate {
        description: "Currency exchange rates from the Frankfurter API",
        tools: {
            "get_exchange_rate" => get_exchange_rate {
                description: "Retrieve the exchange rate between two currencies on a specific date.",
                params: [
                    "currency_from": "string" => "Base currency (3-letter ISO code)." = "USD",
                    "currency_to": "string" => "Target currency (3-letter ISO code)." = "EUR",
                    "currency_date": "string" => "Date to query (YYYY-MM-DD or 'latest')." = "latest"
                ]
            }
        }
    }
}

impl ExchangeRate {
    pub fn with_config(config: ExchangeRateConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    /// HTTP client honouring the configured timeout, built on first use.
    fn client(&self) -> Result<&reqwest::Client, reqwest::Error> {
        self.client.get_or_try_init(|| {
            reqwest::Client::builder()
                .user_agent("Cambist/0.1")
                .timeout(self.config.timeout)
                .build()
        })
    }

    pub fn config(&self) -> &ExchangeRateConfig {
        &self.config
    }

    async fn get_exchange_rate(&self, args: &Value) -> Result<String> {
        let query = RateQuery::from_args(args)?;
        info!(
            currency_from = %query.from,
            currency_to = %query.to,
            currency_date = %query.date,
            "Fetching exchange rate"
        );

        let payload = self.fetch(&query).await?;
        Ok(payload.to_string())
    }

    /// Fetch the decoded payload, retrying with exponential backoff.
    pub async fn fetch(&self, query: &RateQuery) -> Result<Value, ExchangeRateError> {
        let attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.attempt(query).await {
                Ok(payload) => return Ok(payload),
                Err(e) => {
                    warn!(attempt, error = %e, "Attempt to fetch exchange rate failed");
                    if attempt >= attempts {
                        return Err(ExchangeRateError::Unavailable { attempts, last: e });
                    }
                    tokio::time::sleep(self.backoff(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.config.backoff_base.saturating_mul(1u32 << attempt.min(16))
    }

    async fn attempt(&self, query: &RateQuery) -> Result<Value, AttemptError> {
        let url = format!("{}/{}", self.config.api_url.trim_end_matches('/'), query.date);

        let response = self
            .client()?
            .get(&url)
            .query(&[("base", query.from.as_str()), ("symbols", query.to.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status));
        }

        let payload: Value = response.json().await?;
        if rate(&payload, &query.to).is_none() {
            return Err(AttemptError::MissingRate(query.to.clone()));
        }

        Ok(payload)
    }
}

/// The rate for `target` in a Frankfurter payload.
pub fn rate(payload: &Value, target: &str) -> Option<f64> {
    payload.get("rates")?.get(target)?.as_f64()
}
