use std::net::SocketAddr;
use std::path::PathBuf;
use std::thread;

use clap::Parser;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,natureseek=info";

/// Server settings. Every flag can also come from the environment.
#[derive(Parser, Clone, Debug)]
#[clap(author, version, about = "Agricultural records server", long_about = None)]
pub struct ServerConfig {
    /// Address the HTTP API binds to
    #[clap(long, env = "NATURESEEK_ADDR", default_value = "127.0.0.1:9000")]
    pub addr: SocketAddr,

    /// JSON table holding the records
    #[clap(long, env = "NATURESEEK_DATA", default_value = "natureseek_records.json")]
    pub data: PathBuf,

    /// tracing filter, e.g. "debug" or "info,warp=warn"
    #[clap(long, env = "NATURESEEK_LOG")]
    pub log: Option<String>,

    /// Runtime worker threads (defaults to the logical core count)
    #[clap(long, env = "NATURESEEK_WORKERS")]
    pub workers: Option<usize>,
}

impl ServerConfig {
    pub fn worker_threads(&self) -> usize {
        self.workers
            .filter(|&n| n > 0)
            .unwrap_or_else(|| thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }
}

/// Console settings.
#[derive(Parser, Clone, Debug)]
#[clap(author, version, about = "Interactive console for natureseek", long_about = None)]
pub struct CliConfig {
    /// Server to talk to
    #[clap(long, env = "NATURESEEK_HOST", default_value = "127.0.0.1:9000")]
    pub host: String,

    /// Work directly on a local JSON table instead of a server (wins over --host)
    #[clap(long)]
    pub local: Option<PathBuf>,

    #[clap(long, env = "NATURESEEK_LOG")]
    pub log: Option<String>,
}

/// Installs the fmt subscriber. `explicit` wins over `RUST_LOG`.
pub fn init_tracing(explicit: Option<&str>) {
    let filter = explicit
        .and_then(|f| EnvFilter::try_new(f).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_level(true)
    .try_init();
}
