use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Error;

/// The price/outcome data feed collaborator.
///
/// An external market-data source the engine consults only at signing time
/// (never at commit time), for the realized value of an asset at a past
/// instant. Failures surface uniformly as [`Error::FeedUnavailable`].
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn past_price(
        &self,
        asset_id: &str,
        currency: &str,
        at: DateTime<Utc>,
    ) -> Result<f64, Error>;
}
