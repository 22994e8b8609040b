use std::time::Duration;

use anyhow::{Context, Result};
use pulse_pipeline::{
    source::{BackoffConfig, JsonLinesSource, ReconnectingSource, SimulatedSource},
    ChatPipeline, PipelineConfig,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = PipelineConfig::from_env().context("invalid configuration")?;
    pulse_queue::init_tracing(config.log_json);

    let pipeline = ChatPipeline::with_lexicon(&config)?;
    pipeline.start()?;

    let reporter = {
        let pipeline = pipeline.clone();
        let period = config.report_interval.max(Duration::from_millis(100));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let stats = pipeline.stats();
                info!(
                    enqueued = stats.total_enqueued,
                    processed = stats.total_processed,
                    failed = stats.total_failed,
                    queue_size = stats.queue_size,
                    workers = stats.worker_count,
                    avg_ms = stats.avg_processing_time,
                    per_second = stats.messages_per_second,
                    "queue stats"
                );
            }
        })
    };

    let mut ingest = match std::env::args().nth(1) {
        Some(path) => {
            let source = JsonLinesSource::open(&path)
                .await
                .with_context(|| format!("cannot open chat log {path}"))?;
            pipeline.spawn_ingest(source)
        }
        None => {
            let mut simulated = SimulatedSource::new(config.sim_channel.clone(), config.sim_seed)
                .with_interval(config.sim_interval);
            if let Some(count) = config.sim_messages {
                simulated = simulated.with_count(count);
            }
            if let Some(every) = config.sim_disconnect_every {
                simulated = simulated.with_disconnect_every(every);
            }
            pipeline.spawn_ingest(ReconnectingSource::new(
                simulated,
                BackoffConfig::default(),
                config.reconnect_max_attempts,
            ))
        }
    };

    let finished = tokio::select! {
        result = &mut ingest => Some(result),
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
            None
        }
    };

    pipeline.shutdown(config.drain_timeout).await?;
    reporter.abort();

    let ingest_result = match finished {
        Some(result) => result,
        None => ingest.await,
    };
    match ingest_result.context("ingest task failed")? {
        Ok(report) => info!(
            source = %report.source,
            received = report.received,
            malformed = report.malformed,
            "ingest report"
        ),
        Err(e) => warn!("ingest ended with error: {}", e),
    }

    let dead_letters = pipeline.dead_letters().len();
    let output = serde_json::json!({
        "stats": pipeline.stats(),
        "summary": pipeline.summary(),
        "dead_letters": dead_letters,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
