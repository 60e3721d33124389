//! HTTP server command
//!
//! Connects to Postgres, applies pending migrations, then serves the
//! user routes until shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use userctl_server::db::create_pool;
use userctl_server::{
    run_server, AppState, DbConfig, Migrator, PgUserStore, ServerConfig, UserService,
};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to
    #[arg(long, short = 'b', env = "USERCTL_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let db_config = DbConfig::from_env().context("Invalid database configuration")?;
    tracing::info!(
        host = %db_config.host,
        port = db_config.port,
        database = %db_config.database,
        "Starting userctl server on {}",
        args.bind
    );

    let pool = create_pool(&db_config)
        .await
        .context("Failed to create database pool")?;

    // Schema must be current before the first request
    let applied = Migrator::new(&pool)
        .run_pending()
        .await
        .context("Failed to apply migrations")?;
    for name in &applied {
        tracing::info!(migration = *name, "applied at startup");
    }

    let users = UserService::new(Arc::new(PgUserStore::new(pool.clone())));
    let config = ServerConfig {
        bind_addr: args.bind,
        cors_permissive: args.cors_permissive,
    };

    // Blocks until shutdown
    let result = run_server(AppState::new(users), config)
        .await
        .context("Server error");

    pool.close().await;
    result
}
