//! HTTP rate provider
//!
//! Understands the two body shapes served by exchangerate.host:
//! `{"result": 36.5}` from `/convert` and `{"rates": {"VES": 36.5}}` from
//! `/latest`. Endpoints are tried in order and the first usable answer wins.

use crate::error::ProviderError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use spacebook_core::{traits::RateProvider, AppResult};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument, warn};

#[derive(Debug, Deserialize)]
struct RateBody {
    result: Option<serde_json::Number>,
    #[serde(default)]
    rates: HashMap<String, serde_json::Number>,
}

pub struct HttpRateProvider {
    client: reqwest::Client,
    urls: Vec<String>,
}

impl HttpRateProvider {
    pub fn new(urls: Vec<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;

        Ok(Self { client, urls })
    }

    async fn fetch_from(&self, url: &str) -> Result<Decimal, ProviderError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ProviderError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body: RateBody = response
            .json()
            .await
            .map_err(|source| ProviderError::Request {
                url: url.to_string(),
                source,
            })?;

        extract_rate(&body).ok_or_else(|| ProviderError::MissingRate {
            url: url.to_string(),
        })?
    }
}

fn extract_rate(body: &RateBody) -> Option<Result<Decimal, ProviderError>> {
    let number = body.result.as_ref().or_else(|| body.rates.get("VES"))?;
    let text = number.to_string();
    let rate = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()?;

    if rate <= Decimal::ZERO {
        return Some(Err(ProviderError::NonPositive(text)));
    }
    Some(Ok(rate))
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    #[instrument(skip(self))]
    async fn fetch_rate(&self) -> AppResult<Decimal> {
        let mut last_error = ProviderError::NoEndpoints;

        for url in &self.urls {
            match self.fetch_from(url).await {
                Ok(rate) => {
                    debug!(%url, %rate, "Fetched exchange rate");
                    return Ok(rate);
                }
                Err(e) => {
                    warn!("Exchange rate endpoint failed: {}", e);
                    last_error = e;
                }
            }
        }

        Err(last_error.into())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
