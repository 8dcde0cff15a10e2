//! qna-server binary: migrate, then serve.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use qna_core::config::DatabaseConfig;
use qna_server::db::{Db, Migrator};
use qna_server::http::server::{run_server, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "qna-server", about = "Questions-and-answers web service", version)]
struct Args {
    /// Address to bind the HTTP server to
    #[arg(long, default_value = "127.0.0.1:3030")]
    bind: SocketAddr,

    /// Connection URL override; otherwise QNA_* variables apply
    #[arg(long)]
    database_url: Option<String>,

    /// Apply pending migrations and exit without serving
    #[arg(long, default_value_t = false)]
    migrate_only: bool,

    /// Revert the newest applied migration and exit
    #[arg(long, default_value_t = false)]
    revert: bool,

    /// Allow any CORS origin (development only)
    #[arg(long, default_value_t = false)]
    cors_permissive: bool,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long, default_value_t = false)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.debug)?;

    // Pick up .env before reading QNA_* variables; absence is fine.
    let _ = dotenvy::dotenv();

    let config = DatabaseConfig::from_env().context("invalid configuration")?;

    let db = match &args.database_url {
        Some(url) => Db::connect_url(url, &config.pool).await,
        None => Db::connect(&config).await,
    }
    .context("database connection failed")?;

    let migrator = Migrator::baseline();

    if args.revert {
        match migrator.revert_last(&db).await.context("revert failed")? {
            Some(version) => tracing::info!(version, "reverted"),
            None => tracing::info!("nothing to revert"),
        }
        return Ok(());
    }

    // The schema must be in a known state before the listener binds.
    migrator
        .run(&db)
        .await
        .context("migration failed, refusing to serve")?;

    if args.migrate_only {
        return Ok(());
    }

    let server_config = ServerConfig {
        bind_addr: args.bind,
        cors_permissive: args.cors_permissive,
    };
    run_server(db, server_config).await?;

    Ok(())
}

fn init_tracing(debug: bool) -> Result<()> {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(debug)
        .compact()
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))
}
