mod client;
mod config;
mod phash;
mod pipeline;
mod probe;
mod proxy_vlm;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use config::Config;
use futures::stream::{FuturesUnordered, StreamExt};
use kibotos_telemetry::{init_logging, metrics, TelemetryConfig};
use kibotos_types::{EvaluationOutcome, FetchRequest, SubmitRequest};
use kibotos_vlm::{HttpVlmClient, VlmClient};
use uuid::Uuid;

use client::GatewayClient;
use pipeline::{evaluate, PipelineDeps};
use probe::{ContainerSniffProbe, VideoProbe};
use proxy_vlm::ProxyVlmClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    let telemetry_config = TelemetryConfig::from_env("kibotos-worker");
    init_logging(&telemetry_config)?;
    metrics::register_metrics()?;

    let worker_id = config
        .worker_id
        .clone()
        .unwrap_or_else(|| format!("worker-{}", Uuid::new_v4()));

    let gateway = Arc::new(GatewayClient::new(&config.api_url));

    let vlm: Arc<dyn VlmClient> = match (&config.vlm_api_url, &config.vlm_api_key, &config.vlm_model) {
        (Some(url), Some(key), Some(model)) => {
            tracing::info!("using direct VLM credentials");
            Arc::new(HttpVlmClient::new(url.clone(), key.clone(), model.clone()))
        }
        _ => {
            tracing::info!("proxying VLM calls through the gateway");
            Arc::new(ProxyVlmClient::new(gateway.clone()))
        }
    };

    let probe: Arc<dyn VideoProbe> = Arc::new(ContainerSniffProbe);

    let deps = Arc::new(PipelineDeps {
        gateway: gateway.clone(),
        vlm,
        probe,
        keyframe_count: config.keyframe_count,
        worker_id: worker_id.clone(),
    });

    tracing::info!(worker_id = %worker_id, api_url = %config.api_url, "kibotos-worker starting");

    let mut shutdown = Box::pin(tokio::signal::ctrl_c());

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("shutdown signal received, stopping after current batch");
                break;
            }
            result = run_batch(&gateway, &deps, &config, &worker_id) => {
                match result {
                    Ok(0) => tokio::time::sleep(Duration::from_secs(config.poll_interval_sec)).await,
                    Ok(_) => {}
                    Err(err) => {
                        tracing::error!(error = %err, "batch failed, backing off");
                        tokio::time::sleep(Duration::from_secs(config.poll_interval_sec)).await;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Leases up to `batch_size` submissions and evaluates them concurrently,
/// bounded by `config.concurrency`. Returns the number of leases processed.
async fn run_batch(
    gateway: &Arc<GatewayClient>,
    deps: &Arc<PipelineDeps>,
    config: &Config,
    worker_id: &str,
) -> anyhow::Result<usize> {
    let leases = gateway
        .fetch(FetchRequest {
            worker_id: worker_id.to_string(),
            limit: config.batch_size,
            lease_duration_sec: config.lease_duration_sec,
        })
        .await?
        .leases;

    if leases.is_empty() {
        return Ok(0);
    }

    metrics::LEASES_GRANTED.inc_by(leases.len() as f64);

    let lease_duration = Duration::from_secs(config.lease_duration_sec as u64);
    let mut in_flight = FuturesUnordered::new();
    let mut leases = leases.into_iter();
    let mut processed = 0usize;

    for _ in 0..config.concurrency {
        if let Some(leased) = leases.next() {
            in_flight.push(process_one(gateway.clone(), deps.clone(), leased, lease_duration, worker_id.to_string()));
        }
    }

    while let Some(()) = in_flight.next().await {
        processed += 1;
        if let Some(leased) = leases.next() {
            in_flight.push(process_one(gateway.clone(), deps.clone(), leased, lease_duration, worker_id.to_string()));
        }
    }

    Ok(processed)
}

async fn process_one(
    gateway: Arc<GatewayClient>,
    deps: Arc<PipelineDeps>,
    leased: kibotos_types::LeasedSubmission,
    lease_duration: Duration,
    worker_id: String,
) {
    let uuid = leased.submission.uuid;
    let outcome = evaluate(&deps, &leased, lease_duration).await;

    let Some(outcome) = outcome else {
        tracing::info!(uuid = %uuid, "abandoning submission after lost lease renewal");
        return;
    };

    let label = match &outcome {
        EvaluationOutcome::Scored { .. } => "scored",
        EvaluationOutcome::Rejected { .. } => "rejected",
    };
    metrics::EVALUATION_OUTCOMES
        .with_label_values(&["commit", label])
        .inc();

    let result = gateway
        .submit(SubmitRequest {
            worker_id,
            uuid,
            outcome,
        })
        .await;

    if let Err(err) = result {
        tracing::warn!(uuid = %uuid, error = %err, "submit failed");
    }
}
