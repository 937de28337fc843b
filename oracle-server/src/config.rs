use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use oracle_core::Asset;
use serde::Deserialize;

use crate::iso8601;

/// One asset entry as it appears in the YAML configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfigFile {
    pub currency: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "hasDecimals", default)]
    pub has_decimals: bool,
    #[serde(rename = "startDate")]
    pub start_date: DateTime<Utc>,
    pub frequency: String,
    pub range: String,
    #[serde(rename = "eventTypes", default)]
    pub event_types: HashMap<String, bool>,
}

/// Top-level configuration: a map of asset id to its config.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub assets: HashMap<String, AssetConfigFile>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Parses ISO-8601 durations and builds the immutable `Asset` configs
    /// the engine and query surface share.
    pub fn into_assets(self) -> anyhow::Result<HashMap<String, Asset>> {
        self.assets
            .into_iter()
            .map(|(asset_id, cfg)| {
                let frequency = iso8601::parse_duration(&cfg.frequency)
                    .map_err(|e| anyhow::anyhow!("asset {asset_id}: {e}"))?;
                let range = iso8601::parse_duration(&cfg.range)
                    .map_err(|e| anyhow::anyhow!("asset {asset_id}: {e}"))?;

                Ok((
                    asset_id.clone(),
                    Asset {
                        asset_id,
                        description: cfg.description,
                        currency: cfg.currency,
                        has_decimals: cfg.has_decimals,
                        start_date: cfg.start_date,
                        frequency,
                        range,
                        event_types: cfg.event_types,
                    },
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_minimal_asset_config() {
        let yaml = r#"
assets:
  btcusd:
    currency: usd
    hasDecimals: true
    startDate: "2020-01-01T00:00:00Z"
    frequency: PT1H
    range: P1D
    eventTypes:
      digits: true
      above: true
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let assets = config.into_assets().unwrap();
        let btcusd = assets.get("btcusd").unwrap();
        assert_eq!(btcusd.currency, "usd");
        assert!(btcusd.has_decimals);
        assert_eq!(btcusd.frequency, chrono::Duration::hours(1));
        assert_eq!(btcusd.range, chrono::Duration::days(1));
    }
}
