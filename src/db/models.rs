use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip: Option<String>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Medicine {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub quantity: i64,
    pub manufacturer: Option<String>,
    pub medicine_type: Option<String>,
    pub pack_size: Option<String>,
    pub composition_primary: Option<String>,
    pub composition_secondary: Option<String>,
    pub discontinued: bool,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub medicine_id: i64,
    pub quantity: i64,
    pub status: String,
    pub checkout_id: String,
    pub created_at: NaiveDateTime,
}

/// An order line joined with the name of the medicine it bought.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OrderSummary {
    pub id: i64,
    pub medicine_id: i64,
    pub medicine_name: String,
    pub quantity: i64,
    pub status: String,
    pub checkout_id: String,
    pub created_at: NaiveDateTime,
}
