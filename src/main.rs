mod catalog;
mod config;
mod crawler;
mod db;
mod entities;
mod error;
mod extract;
mod fetch;
mod models;
mod robots;
mod routes;
mod store;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sea_orm::DatabaseConnection;

use crate::{
    config::Config,
    crawler::{CrawlSettings, Crawler},
    fetch::Fetcher,
    robots::RobotsPolicy,
    store::Store,
};

pub struct AppState {
    pub db: DatabaseConnection,
}

#[derive(Parser, Debug)]
#[command(name = "cinecrawl")]
#[command(about = "Crawl a movie catalog into SQLite and serve it over HTTP")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl breadth-first from the start listing and store what is found.
    Crawl {
        #[arg(long, help = "Listing URL to seed the crawl with (defaults to START_URL)")]
        start_url: Option<String>,

        #[arg(long, help = "Stop after this many pages; 0 for no limit (defaults to MAX_PAGES)")]
        max_pages: Option<usize>,

        #[arg(long, help = "Pause between requests in milliseconds (defaults to CRAWL_DELAY_MS)")]
        delay_ms: Option<u64>,
    },
    /// Serve the stored catalog as JSON.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,cinecrawl=debug,sqlx=warn".to_string()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    let db = db::connect_and_migrate(&config.database_url)
        .await
        .with_context(|| format!("opening {}", config.database_url))?;

    match cli.command {
        Command::Crawl { start_url, max_pages, delay_ms } => {
            if let Some(start_url) = start_url {
                config.start_url = start_url;
            }
            if let Some(max_pages) = max_pages {
                config.max_pages = (max_pages > 0).then_some(max_pages);
            }
            if let Some(delay_ms) = delay_ms {
                config.crawl_delay_ms = delay_ms;
            }
            crawl(config, db).await
        },
        Command::Serve => serve(config, db).await,
    }
}

async fn crawl(config: Config, db: DatabaseConnection) -> anyhow::Result<()> {
    let client = fetch::http_client(&config)?;
    let policy = RobotsPolicy::load(&client, &config.base_url, &config.user_agent)
        .await
        .context("loading robots policy")?;
    let policy = Arc::new(policy);

    let fetcher = Fetcher::new(
        client,
        policy.clone(),
        config.user_agent.clone(),
        config.render.clone(),
    );
    let crawler =
        Crawler::new(fetcher, Store::new(db), policy, CrawlSettings::from_config(&config));

    tracing::info!(
        start_url = %config.start_url,
        max_pages = ?config.max_pages,
        delay_ms = config.crawl_delay_ms,
        "starting crawl"
    );
    let report = crawler.run().await;
    tracing::info!(visited = report.visited.len(), "crawl done");

    Ok(())
}

async fn serve(config: Config, db: DatabaseConnection) -> anyhow::Result<()> {
    let app = routes::router(Arc::new(AppState { db }));

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
