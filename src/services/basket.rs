use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::models::Medicine;

/// Distinct medicines one basket may hold. The basket travels in the session
/// cookie, which browsers cap at about 4 KB.
pub const MAX_ENTRIES: usize = 40;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BasketError {
    #[error("Quantity must be a positive whole number")]
    InvalidQuantity,
    #[error("Quantity for medicine {0} is too large")]
    QuantityOverflow(i64),
    #[error("Your basket can hold at most {} different medicines", MAX_ENTRIES)]
    TooManyEntries,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasketEntry {
    pub medicine_id: i64,
    pub quantity: u32,
}

/// Candidate purchases for one session, in the order they were first added.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Basket {
    entries: Vec<BasketEntry>,
}

/// One resolved basket line.
#[derive(Debug, Clone, PartialEq)]
pub struct BasketLine {
    pub medicine: Medicine,
    pub quantity: u32,
    pub cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasketView {
    pub lines: Vec<BasketLine>,
    /// Entries whose medicine is no longer in the catalog.
    pub missing: Vec<i64>,
    pub total_cost: f64,
}

impl Basket {
    pub fn entries(&self) -> &[BasketEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Adds `quantity` units of a medicine, merging with an existing entry.
    pub fn add(&mut self, medicine_id: i64, quantity: u32) -> Result<(), BasketError> {
        if quantity == 0 {
            return Err(BasketError::InvalidQuantity);
        }

        let entry_count = self.entries.len();
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.medicine_id == medicine_id)
        {
            Some(entry) => {
                entry.quantity = entry
                    .quantity
                    .checked_add(quantity)
                    .ok_or(BasketError::QuantityOverflow(medicine_id))?;
            }
            None if entry_count >= MAX_ENTRIES => {
                return Err(BasketError::TooManyEntries);
            }
            None => self.entries.push(BasketEntry {
                medicine_id,
                quantity,
            }),
        }

        Ok(())
    }

    /// Drops the entry for `medicine_id`, returning whether one was present.
    pub fn remove(&mut self, medicine_id: i64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.medicine_id != medicine_id);
        before != self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Resolves every entry against the catalog.
    ///
    /// Entries pointing at medicines that no longer exist are collected into
    /// [`BasketView::missing`] instead of failing the whole listing.
    pub async fn resolve(&self, pool: &SqlitePool) -> Result<BasketView, sqlx::Error> {
        let mut view = BasketView::default();

        for entry in &self.entries {
            let medicine = sqlx::query_as::<_, Medicine>("SELECT * FROM medicines WHERE id = $1")
                .bind(entry.medicine_id)
                .fetch_optional(pool)
                .await?;

            match medicine {
                Some(medicine) => {
                    let cost = medicine.price * f64::from(entry.quantity);
                    view.total_cost += cost;
                    view.lines.push(BasketLine {
                        medicine,
                        quantity: entry.quantity,
                        cost,
                    });
                }
                None => {
                    log::warn!(
                        "Basket references missing medicine {}",
                        entry.medicine_id
                    );
                    view.missing.push(entry.medicine_id);
                }
            }
        }

        Ok(view)
    }
}
