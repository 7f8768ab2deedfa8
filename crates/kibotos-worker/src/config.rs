use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "kibotos-worker")]
#[command(about = "Stateless evaluator worker leasing submissions from kibotos-api")]
pub struct Config {
    /// Base URL of the `kibotos-api` gateway this worker leases work from.
    #[arg(long, env = "KIBOTOS_API_URL")]
    pub api_url: String,

    /// Stable identity this worker leases and renews under. Defaults to a
    /// random id per process if unset.
    #[arg(long, env = "KIBOTOS_WORKER_ID")]
    pub worker_id: Option<String>,

    /// Sleep between fetch attempts when no work is available, in seconds.
    #[arg(long, env = "KIBOTOS_POLL_INTERVAL_SEC", default_value_t = 5)]
    pub poll_interval_sec: u64,

    /// Submissions requested per `fetch` call.
    #[arg(long, env = "KIBOTOS_BATCH_SIZE", default_value_t = 4)]
    pub batch_size: u32,

    /// Requested lease lifetime, in seconds. Sized to the worst-case
    /// expected per-submission evaluation time.
    #[arg(long, env = "KIBOTOS_LEASE_DURATION_SEC", default_value_t = 180)]
    pub lease_duration_sec: u32,

    /// Bounded per-worker concurrency processing leased submissions.
    #[arg(long, env = "KIBOTOS_CONCURRENCY", default_value_t = 4)]
    pub concurrency: usize,

    /// Keyframes sampled per video for VLM scoring.
    #[arg(long, env = "KIBOTOS_KEYFRAME_COUNT", default_value_t = 8)]
    pub keyframe_count: u32,

    /// When set, the worker calls the VLM provider directly instead of
    /// proxying through `kibotos-api`. Most deployments leave this unset so
    /// only the gateway ever holds `VLM_API_KEY`.
    #[arg(long, env = "VLM_API_URL")]
    pub vlm_api_url: Option<String>,
    #[arg(long, env = "VLM_API_KEY")]
    pub vlm_api_key: Option<String>,
    #[arg(long, env = "VLM_MODEL")]
    pub vlm_model: Option<String>,
}
