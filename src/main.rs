use dwh_exporter::{api::dwh, config::AppConfig, logging, metrics};
use tracing::error;

#[tokio::main]
async fn main() {
    if let Err(e) = logging::init_logger() {
        eprintln!("Failed to initialize logger: {}", e);
    }

    metrics::init_metrics();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = dwh::start_server(config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
