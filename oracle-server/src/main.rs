use std::str::FromStr;
use std::sync::Arc;

use bitcoin::secp256k1::SecretKey;
use clap::Parser;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;
use diesel_migrations::MigrationHarness;
use oracle_core::Oracle;

use crate::cli::Opts;
use crate::config::Config;
use crate::feed::HttpFeed;
use crate::models::{PostgresStorage, MIGRATIONS};
use crate::routes::AppState;

mod cli;
mod config;
mod error;
mod feed;
mod iso8601;
mod models;
mod routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    pretty_env_logger::try_init()?;

    let opts = Opts::parse();

    let pg_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let signing_key = SecretKey::from_str(
        &std::env::var("ORACLE_KEY").expect("ORACLE_KEY must be set"),
    )?;

    let manager = ConnectionManager::<PgConnection>::new(&pg_url);
    let db_pool = Pool::builder()
        .max_size(10)
        .test_on_check_out(true)
        .connection_timeout(std::time::Duration::from_secs(5))
        .build(manager)
        .expect("could not build connection pool");

    let mut conn = db_pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .expect("migrations could not run");

    let assets = Config::load(&opts.config)?.into_assets()?;
    log::info!("loaded {} asset(s) from {}", assets.len(), opts.config.display());

    let oracle = Oracle::new(PostgresStorage::new(db_pool), signing_key);
    log::info!("oracle public key: {}", oracle.public_key());

    let state = AppState {
        oracle: Arc::new(oracle),
        assets: Arc::new(assets),
        feed: Arc::new(HttpFeed::new(opts.feed_url)),
    };

    let addr: std::net::SocketAddr = format!("0.0.0.0:{}", opts.port)
        .parse()
        .expect("failed to parse bind address");

    let server = axum::Server::bind(&addr).serve(routes::router(state).into_make_service());
    log::info!("oracle-server listening on http://{addr}");

    let graceful = server.with_graceful_shutdown(async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    });

    if let Err(e) = graceful.await {
        log::error!("server error: {e}");
    }

    Ok(())
}
