use actix_web::{http::header, web, HttpResponse};

use crate::error::AppError;
use crate::session::{FlashLevel, SessionContext};

pub mod auth;
pub mod basket;
pub mod dashboard;
pub mod inventory;
pub mod order;
pub mod views;

/// Registers every route of the application.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(home))
        .service(
            web::resource("/register")
                .route(web::get().to(auth::register_form))
                .route(web::post().to(auth::register)),
        )
        .service(
            web::resource("/login")
                .route(web::get().to(auth::login_form))
                .route(web::post().to(auth::login)),
        )
        .route("/logout", web::get().to(auth::logout))
        .service(
            web::resource("/dashboard")
                .route(web::get().to(dashboard::show))
                .route(web::post().to(dashboard::update)),
        )
        .service(
            web::resource("/meds")
                .route(web::get().to(inventory::list_medicines))
                .route(web::post().to(inventory::add_to_basket)),
        )
        .route("/basket", web::get().to(basket::view_basket))
        .route("/basket/remove", web::post().to(basket::remove_from_basket))
        .route("/order", web::post().to(order::place_order));
}

async fn home() -> HttpResponse {
    redirect("/meds")
}

/// `303 See Other` so a POST is followed by a GET.
pub(crate) fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Queues a flash message and redirects.
pub(crate) fn flash_redirect(
    session: &SessionContext,
    level: FlashLevel,
    message: impl Into<String>,
    location: &str,
) -> Result<HttpResponse, AppError> {
    session.flash(level, message)?;
    Ok(redirect(location))
}

/// Renders `body` inside the shared layout, consuming pending flashes.
pub(crate) fn render(
    session: &SessionContext,
    title: &str,
    body: &str,
) -> Result<HttpResponse, AppError> {
    let signed_in = session.user_id()?.is_some();
    let flashes = session.take_flashes();
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(views::layout(title, signed_in, &flashes, body)))
}

/// Treats blank form fields as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
