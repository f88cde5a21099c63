//! Per-request view of the cookie session.
//!
//! Handlers never touch raw session keys: the signed-in user, the basket and
//! pending flash messages all go through [`SessionContext`].

use actix_session::Session;
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::basket::Basket;

const USER_ID_KEY: &str = "user_id";
const BASKET_KEY: &str = "basket";
const FLASHES_KEY: &str = "flashes";
/// Older messages are dropped past this many so the cookie stays small when
/// redirects are not followed.
const MAX_FLASHES: usize = 5;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Warning,
    Danger,
}

impl FlashLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Warning => "warning",
            FlashLevel::Danger => "danger",
        }
    }
}

/// A one-shot message shown on the next rendered page.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Marks `user_id` as signed in. The session id is renewed to avoid
    /// fixation.
    pub fn log_in(&self, user_id: i64) -> Result<(), AppError> {
        self.0.renew();
        self.0
            .insert(USER_ID_KEY, user_id)
            .map_err(|e| AppError::Session(format!("failed to persist session: {}", e)))
    }

    /// Forgets the signed-in user and their basket.
    pub fn log_out(&self) {
        self.0.remove(USER_ID_KEY);
        self.0.remove(BASKET_KEY);
        self.0.renew();
    }

    pub fn user_id(&self) -> Result<Option<i64>, AppError> {
        self.0
            .get::<i64>(USER_ID_KEY)
            .map_err(|e| AppError::Session(format!("failed to read session: {}", e)))
    }

    /// The signed-in user, or [`AppError::LoginRequired`].
    pub fn require_user_id(&self) -> Result<i64, AppError> {
        self.user_id()?.ok_or(AppError::LoginRequired)
    }

    /// The session's basket. A basket that no longer deserializes is
    /// discarded rather than failing the request.
    pub fn basket(&self) -> Basket {
        match self.0.get::<Basket>(BASKET_KEY) {
            Ok(basket) => basket.unwrap_or_default(),
            Err(e) => {
                log::warn!("Discarding unreadable basket: {}", e);
                self.0.remove(BASKET_KEY);
                Basket::default()
            }
        }
    }

    pub fn save_basket(&self, basket: &Basket) -> Result<(), AppError> {
        if basket.is_empty() {
            self.0.remove(BASKET_KEY);
            return Ok(());
        }
        self.0
            .insert(BASKET_KEY, basket)
            .map_err(|e| AppError::Session(format!("failed to store basket: {}", e)))
    }

    pub fn flash(&self, level: FlashLevel, message: impl Into<String>) -> Result<(), AppError> {
        let mut flashes = self.peek_flashes();
        flashes.push(Flash {
            level,
            message: message.into(),
        });
        if flashes.len() > MAX_FLASHES {
            flashes.drain(..flashes.len() - MAX_FLASHES);
        }
        self.0
            .insert(FLASHES_KEY, flashes)
            .map_err(|e| AppError::Session(format!("failed to store flash: {}", e)))
    }

    /// Returns and clears the pending flash messages.
    pub fn take_flashes(&self) -> Vec<Flash> {
        let flashes = self.peek_flashes();
        if !flashes.is_empty() {
            self.0.remove(FLASHES_KEY);
        }
        flashes
    }

    fn peek_flashes(&self) -> Vec<Flash> {
        self.0
            .get::<Vec<Flash>>(FLASHES_KEY)
            .ok()
            .flatten()
            .unwrap_or_default()
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{session_cookie, test_session_middleware};
    use actix_web::{http::StatusCode, test, web, App, HttpResponse};

    #[actix_web::test]
    async fn basket_and_identity_survive_between_requests() {
        let app = test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .route(
                    "/set",
                    web::get().to(|session: SessionContext| async move {
                        session.log_in(7)?;
                        let mut basket = session.basket();
                        basket.add(3, 2).map_err(|e| AppError::Session(e.to_string()))?;
                        session.save_basket(&basket)?;
                        session.flash(FlashLevel::Success, "saved")?;
                        Ok::<_, AppError>(HttpResponse::Ok().finish())
                    }),
                )
                .route(
                    "/get",
                    web::get().to(|session: SessionContext| async move {
                        let user_id = session.require_user_id()?;
                        let flashes = session.take_flashes();
                        let basket = session.basket();
                        Ok::<_, AppError>(HttpResponse::Ok().body(format!(
                            "{}:{}:{}:{}",
                            user_id,
                            basket.entries()[0].quantity,
                            flashes.len(),
                            flashes[0].message
                        )))
                    }),
                )
                .route(
                    "/logout",
                    web::get().to(|session: SessionContext| async move {
                        session.log_out();
                        HttpResponse::Ok().finish()
                    }),
                ),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/set").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = session_cookie(&res).expect("session cookie set");

        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/get").cookie(cookie.clone()).to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = session_cookie(&res).unwrap_or(cookie);
        assert_eq!(test::read_body(res).await, "7:2:1:saved");

        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/logout").cookie(cookie).to_request(),
        )
        .await;
        let cookie = session_cookie(&res).expect("renewed cookie");

        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/get").cookie(cookie).to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
    }

    #[actix_web::test]
    async fn unread_flashes_are_capped() {
        let app = test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .route(
                    "/flood",
                    web::get().to(|session: SessionContext| async move {
                        for n in 0..8 {
                            session.flash(FlashLevel::Warning, format!("message {}", n))?;
                        }
                        Ok::<_, AppError>(HttpResponse::Ok().finish())
                    }),
                )
                .route(
                    "/read",
                    web::get().to(|session: SessionContext| async move {
                        let messages: Vec<String> = session
                            .take_flashes()
                            .into_iter()
                            .map(|flash| flash.message)
                            .collect();
                        HttpResponse::Ok().body(messages.join(","))
                    }),
                ),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/flood").to_request()).await;
        let cookie = session_cookie(&res).expect("session cookie set");

        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/read").cookie(cookie).to_request(),
        )
        .await;
        assert_eq!(
            test::read_body(res).await,
            "message 3,message 4,message 5,message 6,message 7"
        );
    }
}
