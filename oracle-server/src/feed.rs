use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use oracle_core::error::Error;
use oracle_core::feed::PriceFeed;
use serde::Deserialize;

const FEED_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// A `PriceFeed` backed by a plain REST endpoint returning `{"price": f64}`.
///
/// A thin HTTP client for the external market-data source, in the style of
/// the `reqwest` clients other DLC tooling in this ecosystem ships for
/// talking to its oracle/feed counterparts. Requests run under a bounded
/// deadline so a hung feed surfaces as a retryable `FeedUnavailable` instead
/// of stalling the caller indefinitely.
#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFeed {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(FEED_TIMEOUT)
            .build()
            .expect("failed to build feed HTTP client");

        Self { client, base_url }
    }
}

#[derive(Deserialize)]
struct PriceResponse {
    price: f64,
}

#[async_trait]
impl PriceFeed for HttpFeed {
    async fn past_price(
        &self,
        asset_id: &str,
        currency: &str,
        at: DateTime<Utc>,
    ) -> Result<f64, Error> {
        let url = format!(
            "{}/{}/{}?at={}",
            self.base_url.trim_end_matches('/'),
            asset_id,
            currency,
            at.to_rfc3339_opts(SecondsFormat::Secs, true),
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::FeedUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::FeedUnavailable(e.to_string()))?
            .json::<PriceResponse>()
            .await
            .map_err(|e| Error::FeedUnavailable(e.to_string()))?;

        Ok(response.price)
    }
}
