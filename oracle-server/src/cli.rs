use std::path::PathBuf;

use clap::Parser;

/// DLC price/event oracle server.
#[derive(Debug, Parser)]
#[command(name = "oracle-server", version)]
pub struct Opts {
    /// Path to the YAML file describing the assets this oracle publishes.
    #[arg(long, env = "ORACLE_CONFIG", default_value = "oracle.yaml")]
    pub config: PathBuf,

    /// Port the HTTP server binds to. Overrides `ORACLE_PORT` if set.
    #[arg(long, env = "ORACLE_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Base URL of the market-data feed this oracle consults when signing.
    #[arg(long, env = "ORACLE_FEED_URL")]
    pub feed_url: String,
}
