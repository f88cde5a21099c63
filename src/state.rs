use sqlx::SqlitePool;

use crate::config::Config;

/// Shared, cheaply cloneable handler state.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub page_size: u32,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: &Config) -> Self {
        Self {
            pool,
            page_size: config.page_size.max(1),
        }
    }
}
