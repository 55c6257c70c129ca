use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use txscrap::{config::Cli, info_time, process::Scraper, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr, stdout only carries the pingback.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let start_time = Local::now();
    let cli = Cli::parse();
    let scraper = Scraper::from_config(cli.scrape_config()?)?;

    for report in scraper.run_rounds(&cli.from, cli.rounds).await? {
        for failure in &report.failures {
            tracing::warn!(url = %failure.url, error = %failure.error, "Page not stored");
        }
        println!("{}", serde_json::to_string(&report.pingback())?);
    }
    info_time!(start_time, "Full program time:");

    Ok(())
}
