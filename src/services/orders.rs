use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::Order;
use crate::services::basket::{Basket, BasketEntry};

#[derive(Error, Debug)]
pub enum OrderError {
    #[error("Your basket is empty")]
    EmptyBasket,
    #[error("Medicine {0} is no longer available")]
    MissingMedicine(i64),
    #[error("{name} has been discontinued")]
    Discontinued { name: String },
    #[error("Insufficient stock for {name}: requested {requested}, only {available} left")]
    InsufficientStock {
        name: String,
        requested: u32,
        available: i64,
    },
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl OrderError {
    /// Whether the checkout failed because of the basket contents rather than
    /// a server fault.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, OrderError::Sqlx(_))
    }
}

/// Outcome of a committed checkout.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub checkout_id: String,
    pub orders: Vec<Order>,
    pub total_cost: f64,
}

#[derive(sqlx::FromRow)]
struct StockRow {
    name: String,
    price: f64,
    quantity: i64,
    discontinued: bool,
}

/// Converts the basket into order rows and decrements stock, all in one
/// transaction.
///
/// Any failing line rolls back every order and stock change made for the
/// earlier lines. The basket itself is left untouched; the caller clears it
/// once this returns `Ok`.
pub async fn place_order(
    pool: &SqlitePool,
    user_id: i64,
    basket: &Basket,
) -> Result<Receipt, OrderError> {
    if basket.is_empty() {
        return Err(OrderError::EmptyBasket);
    }

    let checkout_id = Uuid::new_v4().to_string();
    let mut transaction = pool.begin().await?;
    let mut orders = Vec::with_capacity(basket.len());
    let mut total_cost = 0.0;

    for entry in basket.entries() {
        match place_line(&mut transaction, user_id, &checkout_id, entry).await {
            Ok((order, cost)) => {
                orders.push(order);
                total_cost += cost;
            }
            Err(e) => {
                transaction.rollback().await?;
                log::warn!("Checkout {} for user {} rejected: {}", checkout_id, user_id, e);
                return Err(e);
            }
        }
    }

    transaction.commit().await?;

    log::info!(
        "Checkout {} for user {} placed {} order(s)",
        checkout_id,
        user_id,
        orders.len()
    );

    Ok(Receipt {
        checkout_id,
        orders,
        total_cost,
    })
}

async fn place_line(
    transaction: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    checkout_id: &str,
    entry: &BasketEntry,
) -> Result<(Order, f64), OrderError> {
    let requested = i64::from(entry.quantity);

    // Check and decrement in one statement so concurrent checkouts cannot
    // oversell.
    let stock = sqlx::query_as::<_, StockRow>(
        "UPDATE medicines SET quantity = quantity - $1
         WHERE id = $2 AND quantity >= $1 AND discontinued = 0
         RETURNING name, price, quantity, discontinued",
    )
    .bind(requested)
    .bind(entry.medicine_id)
    .fetch_optional(&mut **transaction)
    .await?;

    let stock = match stock {
        Some(stock) => stock,
        None => return Err(classify_failure(transaction, entry).await?),
    };

    log::debug!(
        "Reserved {} x {} ({} left)",
        entry.quantity,
        stock.name,
        stock.quantity
    );

    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders (user_id, medicine_id, quantity, status, checkout_id, created_at)
         VALUES ($1, $2, $3, 'pending', $4, $5) RETURNING *",
    )
    .bind(user_id)
    .bind(entry.medicine_id)
    .bind(requested)
    .bind(checkout_id)
    .bind(Utc::now().naive_utc())
    .fetch_one(&mut **transaction)
    .await?;

    Ok((order, stock.price * f64::from(entry.quantity)))
}

/// Works out why the conditional decrement matched no row.
async fn classify_failure(
    transaction: &mut Transaction<'_, Sqlite>,
    entry: &BasketEntry,
) -> Result<OrderError, sqlx::Error> {
    let row = sqlx::query_as::<_, StockRow>(
        "SELECT name, price, quantity, discontinued FROM medicines WHERE id = $1",
    )
    .bind(entry.medicine_id)
    .fetch_optional(&mut **transaction)
    .await?;

    Ok(match row {
        None => OrderError::MissingMedicine(entry.medicine_id),
        Some(row) if row.discontinued => OrderError::Discontinued { name: row.name },
        Some(row) => OrderError::InsufficientStock {
            name: row.name,
            requested: entry.quantity,
            available: row.quantity,
        },
    })
}
