use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::AppError;
use crate::handlers::{flash_redirect, non_blank, render, views};
use crate::services::basket::BasketError;
use crate::services::catalog::{self, CatalogError, CatalogQuery};
use crate::session::{FlashLevel, SessionContext};
use crate::state::AppState;

#[derive(Deserialize, Debug, Default)]
pub struct CatalogParams {
    pub search: Option<String>,
    pub page: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct AddToBasketForm {
    #[serde(default)]
    pub medicine_id: String,
    #[serde(default)]
    pub quantity: String,
}

pub async fn list_medicines(
    state: web::Data<AppState>,
    session: SessionContext,
    params: web::Query<CatalogParams>,
) -> Result<HttpResponse, AppError> {
    session.require_user_id()?;

    let params = params.into_inner();
    let query = CatalogQuery {
        search: non_blank(params.search),
        // Unparseable page numbers fall back to the first page.
        page: params
            .page
            .and_then(|page| page.trim().parse().ok())
            .unwrap_or(1),
    };

    log::info!("Listing medicines");
    let page = catalog::search(&state.pool, &query, state.page_size).await?;
    render(
        &session,
        "Medicines",
        &views::catalog(&page, query.search.as_deref()),
    )
}

pub async fn add_to_basket(
    state: web::Data<AppState>,
    session: SessionContext,
    form: web::Form<AddToBasketForm>,
) -> Result<HttpResponse, AppError> {
    session.require_user_id()?;

    let Ok(medicine_id) = form.medicine_id.trim().parse::<i64>() else {
        return flash_redirect(&session, FlashLevel::Danger, "Unknown medicine.", "/meds");
    };
    let Ok(quantity) = form.quantity.trim().parse::<u32>() else {
        return flash_redirect(
            &session,
            FlashLevel::Danger,
            BasketError::InvalidQuantity.to_string(),
            "/meds",
        );
    };

    let medicine = match catalog::find_orderable(&state.pool, medicine_id).await {
        Ok(medicine) => medicine,
        Err(CatalogError::Sqlx(e)) => return Err(e.into()),
        Err(e) => return flash_redirect(&session, FlashLevel::Danger, e.to_string(), "/meds"),
    };

    let mut basket = session.basket();
    if let Err(e) = basket.add(medicine.id, quantity) {
        return flash_redirect(&session, FlashLevel::Danger, e.to_string(), "/meds");
    }
    session.save_basket(&basket)?;

    log::info!("Added {} x {} to basket", quantity, medicine.name);
    flash_redirect(
        &session,
        FlashLevel::Success,
        "Medicine added to basket!",
        "/meds",
    )
}

#[cfg(test)]
mod tests {
    use crate::services::basket::MAX_ENTRIES;
    use crate::services::catalog::tests::insert_medicine;
    use crate::test_support::{
        body_text, call, location, logged_in, test_app, test_app_with_state, TestClient,
    };
    use actix_web::http::StatusCode;
    use actix_web::test;

    #[actix_web::test]
    async fn catalog_is_searchable_and_paginated() {
        let app = test_app().await;
        let mut client = logged_in(&app).await;

        let res = call(&app, &mut client, test::TestRequest::get().uri("/meds")).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_text(res).await;
        assert!(body.contains("Aspirin"));
        assert!(body.contains("Ibuprofen"));
        assert!(!body.contains("Paracetamol"));
        assert!(body.contains("Page 1 of 2"));

        let res = call(&app, &mut client, test::TestRequest::get().uri("/meds?page=2")).await;
        let body = body_text(res).await;
        assert!(body.contains("Paracetamol"));
        assert!(!body.contains("Aspirin"));

        let res = call(
            &app,
            &mut client,
            test::TestRequest::get().uri("/meds?search=prof&page=nonsense"),
        )
        .await;
        let body = body_text(res).await;
        assert!(body.contains("Ibuprofen"));
        assert!(!body.contains("Aspirin"));
        assert!(body.contains(r#"value="prof""#));
    }

    #[actix_web::test]
    async fn adding_validates_medicine_and_quantity() {
        let app = test_app().await;
        let mut client = logged_in(&app).await;

        for (id, quantity, message) in [
            ("99", "1", "Medicine 99 was not found"),
            ("1", "0", "Quantity must be a positive whole number"),
            ("1", "-2", "Quantity must be a positive whole number"),
            ("abc", "1", "Unknown medicine."),
        ] {
            let res = call(
                &app,
                &mut client,
                test::TestRequest::post()
                    .uri("/meds")
                    .set_form([("medicine_id", id), ("quantity", quantity)]),
            )
            .await;
            assert_eq!(location(&res), "/meds");

            let res = call(&app, &mut client, test::TestRequest::get().uri("/basket")).await;
            let body = body_text(res).await;
            assert!(body.contains(message), "missing flash {:?}", message);
            assert!(body.contains("Your basket is empty"));
        }
    }

    #[actix_web::test]
    async fn catalog_requires_login() {
        let app = test_app().await;
        let mut client = TestClient::default();

        let res = call(
            &app,
            &mut client,
            test::TestRequest::post()
                .uri("/meds")
                .set_form([("medicine_id", "1"), ("quantity", "1")]),
        )
        .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/login");
    }

    #[actix_web::test]
    async fn full_basket_rejects_new_medicines_without_failing() {
        let (app, state) = test_app_with_state().await;
        for id in 10..=(10 + MAX_ENTRIES as i64) {
            insert_medicine(&state.pool, id, &format!("Generic {}", id), 1.0, 5).await;
        }
        let mut client = logged_in(&app).await;

        for id in 10..=(10 + MAX_ENTRIES as i64) {
            let id = id.to_string();
            let res = call(
                &app,
                &mut client,
                test::TestRequest::post()
                    .uri("/meds")
                    .set_form([("medicine_id", id.as_str()), ("quantity", "1")]),
            )
            .await;
            assert_eq!(res.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&res), "/meds");
        }

        let res = call(&app, &mut client, test::TestRequest::get().uri("/basket")).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_text(res).await;
        assert!(body.contains("at most 40 different medicines"));
        assert!(body.contains("Generic 49"));
        assert!(!body.contains("Generic 50"));
    }
}
