//! Loads medicines from a CSV export into the catalog.
//!
//! ```text
//! import medicines.csv
//! ```

use dotenvy::dotenv;
use envconfig::Envconfig;

use epharmacy::{config::Config, db, services::import};

type Error = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    dotenv().ok();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: import <medicines.csv>")?;
    let config = Config::init_from_env()?;

    let contents = tokio::fs::read_to_string(&path).await?;
    let records = import::parse_catalog(&contents)?;
    log::info!("Parsed {} record(s) from {}", records.len(), path);

    let pool = db::init_db(&config.database_url).await?;
    let imported = import::import_records(&pool, &records, config.import_default_stock).await?;

    log::info!("Catalog import finished: {} medicine(s)", imported);
    Ok(())
}
