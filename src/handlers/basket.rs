use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::AppError;
use crate::handlers::{flash_redirect, redirect, render, views};
use crate::session::{FlashLevel, SessionContext};
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct RemoveForm {
    #[serde(default)]
    pub medicine_id: String,
}

pub async fn view_basket(
    state: web::Data<AppState>,
    session: SessionContext,
) -> Result<HttpResponse, AppError> {
    session.require_user_id()?;

    let mut basket = session.basket();
    let view = basket.resolve(&state.pool).await?;

    // Lines whose medicine left the catalog can never be ordered; drop them
    // now and say so instead of failing at checkout.
    if !view.missing.is_empty() {
        for medicine_id in &view.missing {
            basket.remove(*medicine_id);
        }
        session.save_basket(&basket)?;
        session.flash(
            FlashLevel::Warning,
            "Some items are no longer available and were removed from your basket.",
        )?;
    }

    render(&session, "Basket", &views::basket(&view))
}

pub async fn remove_from_basket(
    session: SessionContext,
    form: web::Form<RemoveForm>,
) -> Result<HttpResponse, AppError> {
    session.require_user_id()?;

    let Ok(medicine_id) = form.medicine_id.trim().parse::<i64>() else {
        return flash_redirect(&session, FlashLevel::Danger, "Unknown medicine.", "/basket");
    };

    let mut basket = session.basket();
    if !basket.remove(medicine_id) {
        return Ok(redirect("/basket"));
    }
    session.save_basket(&basket)?;
    flash_redirect(
        &session,
        FlashLevel::Success,
        "Item removed from basket.",
        "/basket",
    )
}

#[cfg(test)]
mod tests {
    use crate::test_support::{body_text, call, location, logged_in, test_app_with_state};
    use actix_web::http::StatusCode;
    use actix_web::test;

    #[actix_web::test]
    async fn basket_merges_lists_costs_and_drops_vanished_items() {
        let (app, state) = test_app_with_state().await;
        let mut client = logged_in(&app).await;

        for (id, quantity) in [("1", "1"), ("2", "1"), ("1", "3")] {
            call(
                &app,
                &mut client,
                test::TestRequest::post()
                    .uri("/meds")
                    .set_form([("medicine_id", id), ("quantity", quantity)]),
            )
            .await;
        }

        let res = call(&app, &mut client, test::TestRequest::get().uri("/basket")).await;
        let body = body_text(res).await;
        assert!(body.contains("<td>Aspirin</td><td>4</td><td>2.50</td><td>10.00</td>"));
        assert!(body.contains("<td>Ibuprofen</td><td>1</td><td>4.00</td><td>4.00</td>"));
        assert!(body.contains("Total: <strong>14.00</strong>"));

        sqlx::query("DELETE FROM medicines WHERE id = 2")
            .execute(&state.pool)
            .await
            .unwrap();

        let res = call(&app, &mut client, test::TestRequest::get().uri("/basket")).await;
        let body = body_text(res).await;
        assert!(body.contains("no longer available"));
        assert!(!body.contains("Ibuprofen"));
        assert!(body.contains("Total: <strong>10.00</strong>"));

        let res = call(
            &app,
            &mut client,
            test::TestRequest::post()
                .uri("/basket/remove")
                .set_form([("medicine_id", "1")]),
        )
        .await;
        assert_eq!(location(&res), "/basket");

        let res = call(&app, &mut client, test::TestRequest::get().uri("/basket")).await;
        assert!(body_text(res).await.contains("Your basket is empty"));
    }

    #[actix_web::test]
    async fn malformed_removal_is_flashed() {
        let (app, _) = test_app_with_state().await;
        let mut client = logged_in(&app).await;

        let res = call(
            &app,
            &mut client,
            test::TestRequest::post()
                .uri("/basket/remove")
                .set_form([("medicine_id", "one")]),
        )
        .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/basket");

        let res = call(&app, &mut client, test::TestRequest::get().uri("/basket")).await;
        assert!(body_text(res).await.contains("Unknown medicine."));
    }
}
