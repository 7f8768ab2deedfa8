//! Prometheus metrics shared by the scheduler, worker, and API gateway.
//!
//! Naming follows `kibotos_<component>_<metric>_<unit>`.

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Gauge, HistogramVec, Opts, Registry, TextEncoder};

lazy_static! {
    /// Global metrics registry; every metric below is registered into it.
    pub static ref REGISTRY: Registry = Registry::new();

    // ---------------------------------------------------------------
    // Scheduler
    // ---------------------------------------------------------------

    /// Cycle state transitions observed by the scheduler.
    pub static ref CYCLE_TRANSITIONS: CounterVec = CounterVec::new(
        Opts::new("kibotos_scheduler_cycle_transitions_total", "Cycle state transitions performed"),
        &["to_state"]
    ).expect("metric creation failed");

    /// Scheduler loop iteration latency.
    pub static ref SCHEDULER_LOOP_SECONDS: HistogramVec = HistogramVec::new(
        prometheus::HistogramOpts::new(
            "kibotos_scheduler_loop_duration_seconds",
            "Time spent in one scheduler loop iteration"
        ),
        &["outcome"]
    ).expect("metric creation failed");

    // ---------------------------------------------------------------
    // Admission / API
    // ---------------------------------------------------------------

    /// Submissions accepted or rejected at admission time, by outcome.
    pub static ref ADMISSION_OUTCOMES: CounterVec = CounterVec::new(
        Opts::new("kibotos_admission_outcomes_total", "Admission attempts by outcome"),
        &["outcome"]
    ).expect("metric creation failed");

    /// HTTP requests served by the API gateway.
    pub static ref HTTP_REQUESTS: CounterVec = CounterVec::new(
        Opts::new("kibotos_api_http_requests_total", "HTTP requests by route and status"),
        &["route", "status"]
    ).expect("metric creation failed");

    // ---------------------------------------------------------------
    // Evaluator worker
    // ---------------------------------------------------------------

    /// Submissions leased by workers.
    pub static ref LEASES_GRANTED: Counter = Counter::new(
        "kibotos_worker_leases_granted_total",
        "Total submissions leased across all workers"
    ).expect("metric creation failed");

    /// Evaluation pipeline outcomes by stage and result.
    pub static ref EVALUATION_OUTCOMES: CounterVec = CounterVec::new(
        Opts::new("kibotos_worker_evaluation_outcomes_total", "Evaluation pipeline outcomes"),
        &["stage", "outcome"]
    ).expect("metric creation failed");

    /// Current count of in-flight VLM calls.
    pub static ref VLM_INFLIGHT: Gauge = Gauge::new(
        "kibotos_worker_vlm_inflight",
        "VLM calls currently in flight"
    ).expect("metric creation failed");

    /// Aggregator weight computations performed.
    pub static ref AGGREGATIONS_RUN: Counter = Counter::new(
        "kibotos_aggregator_runs_total",
        "Total cycle aggregations performed"
    ).expect("metric creation failed");
}

/// Register every metric above into the global registry. Idempotent: safe
/// to call once per process at startup.
pub fn register_metrics() -> Result<(), prometheus::Error> {
    REGISTRY.register(Box::new(CYCLE_TRANSITIONS.clone()))?;
    REGISTRY.register(Box::new(SCHEDULER_LOOP_SECONDS.clone()))?;
    REGISTRY.register(Box::new(ADMISSION_OUTCOMES.clone()))?;
    REGISTRY.register(Box::new(HTTP_REQUESTS.clone()))?;
    REGISTRY.register(Box::new(LEASES_GRANTED.clone()))?;
    REGISTRY.register(Box::new(EVALUATION_OUTCOMES.clone()))?;
    REGISTRY.register(Box::new(VLM_INFLIGHT.clone()))?;
    REGISTRY.register(Box::new(AGGREGATIONS_RUN.clone()))?;
    Ok(())
}

/// Render the registry in Prometheus text exposition format.
pub fn encode() -> Result<Vec<u8>, prometheus::Error> {
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_encode_does_not_panic() {
        // Registration may already have happened in another test in this
        // binary; both outcomes are fine, we just care encode() works.
        let _ = register_metrics();
        CYCLE_TRANSITIONS.with_label_values(&["ACTIVE"]).inc();
        let out = encode().expect("encode should succeed");
        assert!(!out.is_empty());
    }
}
