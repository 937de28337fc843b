use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Configuration descriptor for a tradable series.
///
/// Installed at boot from configuration and immutable at runtime; the
/// engine only ever borrows it.
#[derive(Debug, Clone)]
pub struct Asset {
    pub asset_id: String,
    pub description: Option<String>,
    pub currency: String,
    pub has_decimals: bool,
    pub start_date: DateTime<Utc>,
    pub frequency: Duration,
    pub range: Duration,
    pub event_types: HashMap<String, bool>,
}
