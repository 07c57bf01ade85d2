use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use natureseek::config::{init_tracing, ServerConfig};
use natureseek::server::NatureServer;
use natureseek::storage::JsonFileStore;
use natureseek::NatureDb;

fn main() -> ExitCode {
    let config = ServerConfig::parse();
    init_tracing(config.log.as_deref());

    let runtime = match tokio::runtime::Builder::new_multi_thread()
    .worker_threads(config.worker_threads())
    .enable_all()
    .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(async_main(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("server stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn async_main(config: ServerConfig) -> Result<(), warp::Error> {
    info!(
        data = %config.data.display(),
        workers = config.worker_threads(),
        "--- natureseek server ---"
    );

    let db = Arc::new(NatureDb::new(JsonFileStore::new(&config.data)));
    info!("{} record(s) loaded", db.records().len());

    NatureServer::new(db).run(config.addr).await
}
