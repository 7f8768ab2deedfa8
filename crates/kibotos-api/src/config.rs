//! Environment-driven configuration for the gateway binary.

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "kibotos-api")]
#[command(about = "Kibotos REST gateway: admission, reads, and the internal worker leasing surface")]
pub struct Config {
    /// Postgres connection string.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Connection pool size for this replica.
    #[arg(long, env = "KIBOTOS_DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub db_max_connections: u32,

    /// Address the HTTP server binds to.
    #[arg(long, env = "KIBOTOS_API_BIND", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Bearer token gating `POST /v1/admin/prompts`.
    #[arg(long, env = "KIBOTOS_ADMIN_TOKEN")]
    pub admin_token: String,

    #[arg(long, env = "S3_BUCKET")]
    pub s3_bucket: String,
    #[arg(long, env = "S3_REGION")]
    pub s3_region: String,
    #[arg(long, env = "S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,
    #[arg(long, env = "AWS_ACCESS_KEY_ID")]
    pub aws_access_key_id: String,
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY")]
    pub aws_secret_access_key: String,
    /// Use path-style bucket addressing (required by most non-AWS S3 providers).
    #[arg(long, env = "S3_PATH_STYLE", default_value_t = false)]
    pub s3_path_style: bool,

    #[arg(long, env = "VLM_API_URL")]
    pub vlm_api_url: String,
    #[arg(long, env = "VLM_API_KEY")]
    pub vlm_api_key: String,
    #[arg(long, env = "VLM_MODEL")]
    pub vlm_model: String,

    /// Presigned URL lifetime for uploads and downloads, in seconds.
    #[arg(long, env = "KIBOTOS_PRESIGN_TTL_SEC", default_value_t = 900)]
    pub presign_ttl_sec: u32,

    /// Global VLM calls/sec budget shared across every gateway replica via
    /// the in-process token bucket (backstopped by the store's counter row).
    #[arg(long, env = "KIBOTOS_VLM_RATE_PER_SEC", default_value_t = 4)]
    pub vlm_rate_per_sec: u32,

    /// Per-connection request rate limit at the HTTP edge, independent of
    /// the per-miner admission limit.
    #[arg(long, env = "KIBOTOS_HTTP_RATE_PER_SEC", default_value_t = 50)]
    pub http_rate_per_sec: u32,
}

impl Config {
    pub fn object_store_config(&self) -> kibotos_objectstore::ObjectStoreConfig {
        kibotos_objectstore::ObjectStoreConfig {
            bucket: self.s3_bucket.clone(),
            region: self.s3_region.clone(),
            endpoint: self.s3_endpoint.clone(),
            access_key: self.aws_access_key_id.clone(),
            secret_key: self.aws_secret_access_key.clone(),
            path_style: self.s3_path_style,
        }
    }
}
