use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::time::{Interval, MissedTickBehavior};

mod ai;
mod api;
mod app;
mod config;
mod db;
mod error;
mod feed;
mod models;
#[cfg(test)]
mod test_support;

use app::App;
use config::Config;
use error::Result;

#[derive(Debug, Parser)]
#[command(version, about = "AI news aggregator tracking investment sentiment and bubble indicators")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the JSON API (default)
    Serve {
        /// Overrides the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Fetch all feeds once and exit
    Refresh,
    /// Analyze one batch of unprocessed articles and exit
    Analyze,
    /// Print article statistics as JSON
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let app = App::new(&config).await?;

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => {
            let port = port.unwrap_or(config.port);
            serve(Arc::new(app), port, config.refresh_interval_minutes).await?;
        }
        Command::Refresh => {
            let new_articles = app.refresh_feeds().await;
            println!(
                "Refreshed {} feeds, {} new articles",
                app.feeds().len(),
                new_articles
            );
        }
        Command::Analyze => {
            if !app.analyzer.has_api_key().await {
                println!("API key not configured; set ANTHROPIC_API_KEY or claude_api_key");
                return Ok(());
            }
            let processed = app.process_unanalyzed().await?;
            println!("Analyzed {} articles", processed);
        }
        Command::Stats => {
            let stats = app.repository.stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

async fn serve(app: Arc<App>, port: u16, refresh_interval_minutes: u32) -> Result<()> {
    if refresh_interval_minutes > 0 {
        tokio::spawn(refresh_loop(
            app.clone(),
            Duration::from_secs(u64::from(refresh_interval_minutes) * 60),
        ));
    }

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("Listening on http://localhost:{}", port);
    axum::serve(listener, api::router(app)).await?;
    Ok(())
}

/// A refresh that overruns the period pushes the next one back instead of
/// triggering catch-up runs.
fn refresh_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Runs refresh then analysis on a fixed period, starting immediately.
async fn refresh_loop(app: Arc<App>, period: Duration) {
    let mut interval = refresh_interval(period);
    loop {
        interval.tick().await;
        app.refresh_feeds().await;
        if let Err(e) = app.process_unanalyzed().await {
            tracing::warn!("Scheduled analysis failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn overrunning_refreshes_are_delayed() {
        let interval = refresh_interval(Duration::from_secs(60));
        assert_eq!(interval.missed_tick_behavior(), MissedTickBehavior::Delay);
        assert_eq!(interval.period(), Duration::from_secs(60));
    }
}
