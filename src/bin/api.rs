use std::sync::Arc;

use youthscan::db::establish_connection_pool;
use youthscan::models::config::ServerConfig;
use youthscan::repository::DieselRepository;
use youthscan::retrieval::http::{AppState, router};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let pool = match establish_connection_pool(&config.database_url) {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState {
        repo: DieselRepository::new(pool),
        similarity_threshold: config.similarity_threshold,
    });
    let app = router(state);

    let listener = match tokio::net::TcpListener::bind(&config.api_bind).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("Failed to bind {}: {e}", config.api_bind);
            std::process::exit(1);
        }
    };
    log::info!("Retrieval API listening on {}", config.api_bind);

    if let Err(e) = axum::serve(listener, app).await {
        log::error!("Server error: {e}");
        std::process::exit(1);
    }
}
