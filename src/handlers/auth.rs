use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::AppError;
use crate::handlers::{flash_redirect, non_blank, render, views};
use crate::services::accounts::{self, AccountError, NewAccount};
use crate::session::{FlashLevel, SessionContext};
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub async fn register_form(session: SessionContext) -> Result<HttpResponse, AppError> {
    render(&session, "Register", &views::register_form())
}

pub async fn register(
    state: web::Data<AppState>,
    session: SessionContext,
    form: web::Form<RegisterForm>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let account = NewAccount {
        username: form.username,
        password: form.password,
        first_name: non_blank(form.first_name),
        last_name: non_blank(form.last_name),
    };

    match accounts::register(&state.pool, account).await {
        Ok(_) => flash_redirect(
            &session,
            FlashLevel::Success,
            "Account created successfully! You can now log in.",
            "/login",
        ),
        Err(e) if e.is_validation() => {
            flash_redirect(&session, FlashLevel::Danger, e.to_string(), "/register")
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn login_form(session: SessionContext) -> Result<HttpResponse, AppError> {
    render(&session, "Log in", &views::login_form())
}

pub async fn login(
    state: web::Data<AppState>,
    session: SessionContext,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, AppError> {
    match accounts::authenticate(&state.pool, &form.username, &form.password).await {
        Ok(user) => {
            session.log_in(user.id)?;
            flash_redirect(&session, FlashLevel::Success, "Login successful!", "/dashboard")
        }
        Err(AccountError::InvalidCredentials) => flash_redirect(
            &session,
            FlashLevel::Danger,
            AccountError::InvalidCredentials.to_string(),
            "/login",
        ),
        Err(e) => Err(e.into()),
    }
}

pub async fn logout(session: SessionContext) -> Result<HttpResponse, AppError> {
    session.require_user_id()?;
    session.log_out();
    flash_redirect(
        &session,
        FlashLevel::Success,
        "You have logged out successfully.",
        "/login",
    )
}
