use youthscan::db::establish_connection_pool;
use youthscan::models::config::ServerConfig;
use youthscan::processing::JobMessage;
use youthscan::processing::embedding::process_embed_message;
use youthscan::processing::ingest::process_collect_message;
use youthscan::processing::reconcile::process_reconcile_message;
use youthscan::repository::DieselRepository;

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
    let repo = DieselRepository::new(pool);

    let context = zmq::Context::new();
    let responder = context.socket(zmq::PULL).expect("Cannot create zmq socket");
    responder
        .bind(&config.zmq_address)
        .expect("Cannot bind to zmq port");
    log::info!("Worker listening on {}", config.zmq_address);

    loop {
        let msg = match responder.recv_bytes(0) {
            Ok(msg) => msg,
            Err(e) => {
                log::error!("Failed to receive message: {e}");
                continue;
            }
        };
        match serde_json::from_slice::<JobMessage>(&msg) {
            Ok(parsed) => {
                let repo = repo.clone();
                let config = config.clone();
                tokio::spawn(async move {
                    match parsed {
                        JobMessage::Collect(selector) => {
                            process_collect_message(&selector, &repo, &config).await
                        }
                        JobMessage::Embed(target) => {
                            process_embed_message(target, &repo, &config).await
                        }
                        JobMessage::Reconcile => process_reconcile_message(&repo, &config).await,
                    }
                });
            }
            Err(e) => log::error!("Failed to parse JSON: {e}"),
        }
    }
}
