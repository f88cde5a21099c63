use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::models::Medicine;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Medicine {0} was not found")]
    NotFound(i64),
    #[error("{0} has been discontinued")]
    Discontinued(String),
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Search term and 1-based page number from the catalog query string.
#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    pub search: Option<String>,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_items: i64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u32 {
        if self.total_items <= 0 || self.page_size == 0 {
            return 1;
        }
        let pages = (self.total_items as u64).div_ceil(u64::from(self.page_size));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}

/// Escapes `LIKE` wildcards so a search term only matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Lists medicines whose name contains the search term (case-insensitive),
/// ordered by name, one page at a time.
pub async fn search(
    pool: &SqlitePool,
    query: &CatalogQuery,
    page_size: u32,
) -> Result<Page<Medicine>, CatalogError> {
    let page_size = page_size.max(1);
    let page = query.page.max(1);
    let pattern = like_pattern(query.search.as_deref().map(str::trim).unwrap_or(""));

    let total_items: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM medicines WHERE name LIKE $1 ESCAPE '\\'")
            .bind(&pattern)
            .fetch_one(pool)
            .await?;

    let offset = i64::from(page - 1) * i64::from(page_size);
    let items = sqlx::query_as::<_, Medicine>(
        "SELECT * FROM medicines WHERE name LIKE $1 ESCAPE '\\' ORDER BY name, id LIMIT $2 OFFSET $3",
    )
    .bind(&pattern)
    .bind(i64::from(page_size))
    .bind(offset)
    .fetch_all(pool)
    .await?;

    log::debug!(
        "Catalog search {:?} page {} returned {} of {} items",
        query.search,
        page,
        items.len(),
        total_items
    );

    Ok(Page {
        items,
        page,
        page_size,
        total_items,
    })
}

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Medicine>, CatalogError> {
    let medicine = sqlx::query_as::<_, Medicine>("SELECT * FROM medicines WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(medicine)
}

/// Looks up a medicine that can currently be put in a basket.
pub async fn find_orderable(pool: &SqlitePool, id: i64) -> Result<Medicine, CatalogError> {
    let medicine = find(pool, id).await?.ok_or(CatalogError::NotFound(id))?;
    if medicine.discontinued {
        return Err(CatalogError::Discontinued(medicine.name));
    }
    Ok(medicine)
}
