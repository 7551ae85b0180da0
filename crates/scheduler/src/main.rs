//! Plenário Scheduler
//!
//! Polls for scheduled reports that are due:
//! 1. Loads active reports whose `proximo_envio` has passed
//! 2. Builds the attendance, production or voting summary for the period
//! 3. Stores the run and advances the schedule

mod processor;

use crate::processor::{ProcessorConfig, ReportProcessor};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusBuilder;
use plenario_common::{config::AppConfig, db::DbPool, metrics, VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Consecutive failed polls before backing off
const MAX_FAILURES: u32 = 5;
const CIRCUIT_BREAK_DURATION: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    init_tracing(&config);
    info!("Starting Plenário Scheduler v{}", VERSION);

    if config.observability.metrics_enabled {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.scheduler.metrics_port));
        PrometheusBuilder::new().with_http_listener(addr).install()?;
        metrics::register_metrics();
        info!(%addr, "Metrics listener started");
    }

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;

    let processor = ReportProcessor::new(
        db,
        ProcessorConfig {
            batch_size: config.scheduler.batch_size,
        },
    );

    let mut interval =
        tokio::time::interval(Duration::from_secs(config.scheduler.poll_interval_secs.max(1)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut consecutive_failures = 0;

    info!(
        poll_interval_secs = config.scheduler.poll_interval_secs,
        batch_size = config.scheduler.batch_size,
        "Scheduler ready"
    );

    loop {
        if consecutive_failures >= MAX_FAILURES {
            warn!(failures = consecutive_failures, "Circuit breaker open, pausing...");
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = tokio::time::sleep(CIRCUIT_BREAK_DURATION) => {}
            }
            consecutive_failures = 0;
            info!("Circuit breaker reset, resuming...");
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            _ = interval.tick() => {
                match processor.run_due(Utc::now()).await {
                    Ok(summary) => {
                        consecutive_failures = 0;
                        if summary.succeeded + summary.failed > 0 {
                            info!(
                                succeeded = summary.succeeded,
                                failed = summary.failed,
                                "Scheduled reports processed"
                            );
                        }
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        error!(error = %e, failures = consecutive_failures, "Failed to poll scheduled reports");
                    }
                }
            }
        }
    }

    info!("Scheduler shutting down");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
}
