// ptstats entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config, copying defaults on first run
// 3. Build the stats.nba.com client and the aggregator
// 4. Run the configured job and write its CSV

use std::sync::Arc;

use anyhow::Context;
use ptstats_cli::job::run_job;
use ptstats_client::{load_config, Aggregator, NbaStatsClient};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("ptstats starting up");

    let config = load_config().context("failed to load configuration")?;
    info!(
        kind = ?config.job.kind,
        output = %config.job.output,
        delay_secs = config.requests.delay_secs,
        "config loaded"
    );

    let client = NbaStatsClient::new(&config.api).context("failed to build HTTP client")?;
    let aggregator =
        Aggregator::new(client.clone(), config.requests.delay()).with_resolver(Arc::new(client));

    let file = std::fs::File::create(&config.job.output)
        .with_context(|| format!("failed to create {}", config.job.output))?;

    match run_job(&aggregator, &config.job, file).await {
        Ok(rows) => {
            println!("wrote {rows} rows to {}", config.job.output);
            Ok(())
        }
        Err(e) => {
            error!("job failed: {e:#}");
            Err(e)
        }
    }
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("ptstats.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("ptstats_core=info,ptstats_client=info,ptstats_cli=info,ptstats=info,warn")
        }))
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
