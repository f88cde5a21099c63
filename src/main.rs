use actix_web::HttpServer;
use dotenvy::dotenv;
use envconfig::Envconfig;

use epharmacy::{build_app, config::Config, db, session_key, session_middleware, state::AppState};

type Error = Box<dyn std::error::Error + Send + Sync>;

#[actix_web::main]
async fn main() -> Result<(), Error> {
    // Initialize the logger with default settings or "info" level if not specified
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    log::info!("Starting the e-pharmacy server...");

    // Load environment variables from a .env file if present
    dotenv().ok();

    let config = Config::init_from_env()?;

    let pool = db::init_db(&config.database_url).await?;
    let state = AppState::new(pool, &config);
    let key = session_key(&config);
    let cookie_secure = config.session_cookie_secure;

    log::info!("Listening on {}", config.bind_address);
    HttpServer::new(move || {
        build_app(state.clone(), session_middleware(key.clone(), cookie_secure))
    })
    .bind(&config.bind_address)?
    .run()
    .await?;

    log::info!("Shutting down gracefully");
    Ok(())
}
