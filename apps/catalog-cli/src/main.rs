//! Catalog search CLI.
//!
//! ```bash
//! catalog serve                  # HTTP API
//! catalog index [--all]          # embed + upsert products marked as new (or all)
//! catalog query "brown sugar"    # ranked search from the terminal
//! catalog status                 # catalog / index sizes
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use catalog_api::handlers::AppState;
use catalog_api::{create_router, Services};
use catalog_core::config::Config;
use catalog_core::types::SearchQuery;
use catalog_hybrid::progress_bar;

#[derive(Parser)]
#[command(name = "catalog", version, about = "Hybrid semantic + keyword product search")]
struct Cli {
    /// Directory holding config.toml and config.<env>.toml; relative paths
    /// in the config resolve against it
    #[arg(long, default_value = ".", env = "APP_CONFIG_DIR")]
    config_dir: PathBuf,

    /// Config overlay to apply (dev, prod, test)
    #[arg(long, env = "RUST_ENV", default_value = "dev")]
    env: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run the indexing pipeline
    Index {
        /// Reindex every product, not only those marked as new
        #[arg(long)]
        all: bool,
    },
    /// Run a ranked search and print the results
    Query {
        text: String,
        #[arg(long)]
        store_id: Option<u32>,
        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show catalog and index sizes
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,lance=warn,lancedb=warn,tantivy=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let settings = Config::load_from(&cli.config_dir, &cli.env)?.settings()?;
    let services = Services::build(settings, &cli.config_dir).await?;

    match cli.command {
        Command::Serve { host, port } => serve(&services, host, port).await?,
        Command::Index { all } => {
            let pipeline = services.pipeline().with_progress(progress_bar(0));
            let summary = if all {
                pipeline.index_all(services.catalog.as_ref()).await?
            } else {
                pipeline.index_marked(services.catalog.as_ref()).await?
            };
            println!(
                "indexed {} of {} products ({} skipped, {} failed)",
                summary.indexed, summary.candidates, summary.skipped, summary.failed
            );
        }
        Command::Query { text, store_id, json } => {
            let query = SearchQuery::new(&text).with_store(store_id);
            let ranked = services.engine.search(&query).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&ranked)?);
            } else if ranked.is_empty() {
                println!("no results for '{}'", query.text());
            } else {
                for (i, hit) in ranked.hits.iter().enumerate() {
                    println!("{:>2}. [{:.3}] #{} {}", i + 1, hit.score, hit.product.id, hit.product.name);
                }
            }
        }
        Command::Status => {
            println!("catalog products : {}", services.catalog.products().len());
            println!("lexical documents: {}", services.lexical.len());
            println!(
                "vector entries   : {} (collection '{}', dim {})",
                services.vectors.count().await?,
                services.vectors.collection().name,
                services.vectors.collection().dimension
            );
        }
    }
    Ok(())
}

async fn serve(services: &Services, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| services.settings.server.host.clone());
    let port = port.unwrap_or(services.settings.server.port);
    if services.settings.server.admin_token.is_none() {
        tracing::warn!("server.admin_token is not set; /api/admin/index is open");
    }
    let app = create_router(AppState::from_services(services));
    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
