use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "kibotos-scheduler")]
#[command(about = "Single-writer cycle lifecycle controller")]
pub struct Config {
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    #[arg(long, env = "KIBOTOS_DB_MAX_CONNECTIONS", default_value_t = 5)]
    pub db_max_connections: u32,

    /// Fixed duration of a collection cycle, in minutes.
    #[arg(long, env = "KIBOTOS_CYCLE_DURATION_MIN", default_value_t = 60)]
    pub cycle_duration_min: i64,

    /// How often the control loop re-checks cycle state, in seconds.
    #[arg(long, env = "KIBOTOS_CHECK_INTERVAL_SEC", default_value_t = 30)]
    pub check_interval_sec: u64,

    /// Whether to immediately open a new ACTIVE cycle after completing one.
    #[arg(long, env = "KIBOTOS_AUTO_START", default_value_t = true)]
    pub auto_start: bool,
}
