use actix_web::{
    http::{header, StatusCode},
    HttpResponse, ResponseError,
};
use thiserror::Error;

use crate::handlers::views;
use crate::services::{accounts::AccountError, catalog::CatalogError, orders::OrderError};

/// Failures that end a request without a user-facing flash message.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("You need to log in to view this page.")]
    LoginRequired,
    #[error("Session error: {0}")]
    Session(String),
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Order(#[from] OrderError),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::LoginRequired => StatusCode::SEE_OTHER,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::LoginRequired => HttpResponse::SeeOther()
                .insert_header((header::LOCATION, "/login"))
                .finish(),
            other => {
                log::error!("Request failed: {}", other);
                HttpResponse::InternalServerError()
                    .content_type("text/html; charset=utf-8")
                    .body(views::internal_error())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn login_required_redirects_to_login() {
        let response = AppError::LoginRequired.error_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/login"
        );
    }

    #[actix_web::test]
    async fn internal_errors_do_not_leak_details() {
        let error = AppError::Session("cookie key mismatch at /secret/path".to_string());
        let response = error.error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body()).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(!body.contains("/secret/path"));
        assert!(body.contains("Something went wrong"));
    }
}
