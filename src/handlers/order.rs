use actix_web::{web, HttpResponse};

use crate::error::AppError;
use crate::handlers::flash_redirect;
use crate::services::orders;
use crate::session::{FlashLevel, SessionContext};
use crate::state::AppState;
use crate::utils::format_price;

/// Commits the session basket. The basket is only cleared once the order
/// transaction has committed; a rejected checkout keeps it for another try.
pub async fn place_order(
    state: web::Data<AppState>,
    session: SessionContext,
) -> Result<HttpResponse, AppError> {
    let user_id = session.require_user_id()?;
    let mut basket = session.basket();

    log::info!("Received order from user {}", user_id);
    match orders::place_order(&state.pool, user_id, &basket).await {
        Ok(receipt) => {
            basket.clear();
            session.save_basket(&basket)?;
            flash_redirect(
                &session,
                FlashLevel::Success,
                format!(
                    "Order placed successfully! {} item(s), total {}.",
                    receipt.orders.len(),
                    format_price(receipt.total_cost)
                ),
                "/meds",
            )
        }
        Err(e) if e.is_rejection() => flash_redirect(
            &session,
            FlashLevel::Danger,
            format!("Order failed: {}", e),
            "/basket",
        ),
        Err(e) => Err(e.into()),
    }
}
