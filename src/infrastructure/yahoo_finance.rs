// Yahoo Finance quote sampler implementation
use crate::application::sampler::Sampler;
use crate::domain::error::{Result, TelemetryError};
use crate::domain::record::sample_time;
use crate::domain::stock::StockQuote;
use crate::infrastructure::config::prepare_query;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct YahooQuoteSampler {
    client: reqwest::Client,
    url_template: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionsResponse {
    option_chain: OptionChain,
}

#[derive(Debug, Deserialize)]
struct OptionChain {
    #[serde(default)]
    result: Vec<OptionResult>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OptionResult {
    quote: Quote,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Quote {
    regular_market_price: f64,
}

impl OptionsResponse {
    fn regular_market_price(self) -> anyhow::Result<f64> {
        if let Some(error) = self.option_chain.error.filter(|e| !e.is_null()) {
            anyhow::bail!("Yahoo Finance error: {}", error);
        }
        self.option_chain
            .result
            .into_iter()
            .next()
            .map(|r| r.quote.regular_market_price)
            .context("Yahoo Finance returned no quote")
    }
}

impl YahooQuoteSampler {
    pub fn new(url_template: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build Yahoo Finance client")?;
        Ok(Self {
            client,
            url_template,
        })
    }

    fn build_url(&self, ticker: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("ticker".to_string(), urlencoding::encode(ticker).into_owned());
        prepare_query(&self.url_template, &vars)
    }

    async fn fetch_price(&self, ticker: &str) -> anyhow::Result<f64> {
        let response = self
            .client
            .get(self.build_url(ticker))
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to Yahoo Finance")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Yahoo Finance request failed with status {}: {}", status, body);
        }

        response
            .json::<OptionsResponse>()
            .await
            .context("Failed to parse Yahoo Finance response")?
            .regular_market_price()
    }
}

#[async_trait]
impl Sampler for YahooQuoteSampler {
    type Params = String;
    type Record = StockQuote;

    async fn sample(&self, key: &str, ticker: &String) -> Result<StockQuote> {
        tracing::debug!(key, ticker = %ticker, "fetching quote");
        let price = self
            .fetch_price(ticker)
            .await
            .map_err(|e| TelemetryError::SampleUnavailable {
                key: key.to_string(),
                cause: format!("{e:#}"),
            })?;
        Ok(StockQuote::new(key, ticker, price, sample_time()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_regular_market_price() {
        let body = r#"{"optionChain": {"result": [{
            "underlyingSymbol": "DUOL",
            "quote": {"symbol": "DUOL", "regularMarketPrice": 181.45, "currency": "USD"}
        }], "error": null}}"#;
        let response: OptionsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.regular_market_price().unwrap(), 181.45);
    }

    #[test]
    fn test_empty_result_is_an_error() {
        let body = r#"{"optionChain": {"result": [], "error": null}}"#;
        let response: OptionsResponse = serde_json::from_str(body).unwrap();
        assert!(response.regular_market_price().is_err());
    }

    #[test]
    fn test_upstream_error_is_reported() {
        let body = r#"{"optionChain": {"result": [], "error": {"code": "Not Found"}}}"#;
        let response: OptionsResponse = serde_json::from_str(body).unwrap();
        let err = response.regular_market_price().unwrap_err();
        assert!(err.to_string().contains("Not Found"));
    }

    #[test]
    fn test_build_url_encodes_ticker() {
        let sampler =
            YahooQuoteSampler::new("https://quotes.test/options/${ticker}".to_string(), Duration::from_secs(1))
                .unwrap();
        assert_eq!(sampler.build_url("BRK.B"), "https://quotes.test/options/BRK.B");
        assert_eq!(sampler.build_url("A B"), "https://quotes.test/options/A%20B");
    }
}
