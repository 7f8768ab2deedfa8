mod config;

use clap::Parser;
use config::Config;
use kibotos_aggregator::{aggregate, ScoredSubmission};
use kibotos_store::Store;
use kibotos_telemetry::{init_logging, metrics, TelemetryConfig};
use std::time::Duration as StdDuration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    let telemetry_config = TelemetryConfig::from_env("kibotos-scheduler");
    init_logging(&telemetry_config)?;
    metrics::register_metrics()?;

    let store = Store::connect(&config.database_url, config.db_max_connections).await?;

    if config.auto_start {
        match store.get_open_cycle().await? {
            Some(cycle) => tracing::info!(cycle_id = cycle.id, "resuming with an existing ACTIVE cycle"),
            None => {
                let cycle = store.open_cycle().await?;
                tracing::info!(cycle_id = cycle.id, "opened the initial ACTIVE cycle");
                metrics::CYCLE_TRANSITIONS.with_label_values(&["ACTIVE"]).inc();
            }
        }
    }

    let check_interval = StdDuration::from_secs(config.check_interval_sec);
    let mut shutdown = Box::pin(tokio::signal::ctrl_c());

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("shutdown signal received, exiting control loop");
                break;
            }
            _ = tokio::time::sleep(check_interval) => {}
        }

        if let Err(err) = run_iteration(&store, &config).await {
            tracing::error!(error = %err, "scheduler iteration failed, will retry next tick");
        }
    }

    Ok(())
}

/// One pass of the control loop: at most one state transition per tick, so
/// a slow aggregation never blocks the next cycle from opening on schedule.
async fn run_iteration(store: &Store, config: &Config) -> anyhow::Result<()> {
    let timer = metrics::SCHEDULER_LOOP_SECONDS
        .with_label_values(&["ok"])
        .start_timer();

    let status = store.get_cycle_status().await?;

    if let Some(evaluating_cycle_id) = status.evaluating_cycle_id {
        let remaining = store.count_nonterminal_in_cycle(evaluating_cycle_id).await?;
        if remaining == 0 {
            let breakdown = store.get_scores(evaluating_cycle_id).await?;
            let submissions: Vec<ScoredSubmission> = breakdown
                .into_iter()
                .map(|b| ScoredSubmission {
                    miner_uid: b.miner_uid,
                    final_score: b.total_final_score,
                })
                .collect();

            let mut weights = aggregate(evaluating_cycle_id, &submissions);
            weights.created_at = chrono::Utc::now();

            store.complete_cycle(evaluating_cycle_id, &weights).await?;
            metrics::AGGREGATIONS_RUN.inc();
            metrics::CYCLE_TRANSITIONS.with_label_values(&["COMPLETED"]).inc();
            tracing::info!(cycle_id = evaluating_cycle_id, miners = weights.weights.len(), "completed cycle");

            if config.auto_start {
                let cycle = store.open_cycle().await?;
                metrics::CYCLE_TRANSITIONS.with_label_values(&["ACTIVE"]).inc();
                tracing::info!(cycle_id = cycle.id, "opened the next ACTIVE cycle");
            }
        }
    } else if let Some(active_cycle_id) = status.active_cycle_id {
        let started_at = status
            .active_cycle_started_at
            .expect("active_cycle_started_at set whenever active_cycle_id is");
        let elapsed = chrono::Utc::now() - started_at;
        if elapsed >= chrono::Duration::minutes(config.cycle_duration_min) {
            store.close_cycle_to_evaluating(active_cycle_id).await?;
            metrics::CYCLE_TRANSITIONS.with_label_values(&["EVALUATING"]).inc();
            tracing::info!(cycle_id = active_cycle_id, "closed cycle to EVALUATING");
        }
    } else if config.auto_start {
        let cycle = store.open_cycle().await?;
        metrics::CYCLE_TRANSITIONS.with_label_values(&["ACTIVE"]).inc();
        tracing::info!(cycle_id = cycle.id, "opened a new ACTIVE cycle (none was open)");
    }

    timer.observe_duration();
    Ok(())
}
