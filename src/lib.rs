//! Server-rendered e-pharmacy: accounts, a searchable medicine catalog, a
//! session basket and transactional checkout that decrements stock.

use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{
    body::MessageBody,
    cookie::{Key, SameSite},
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    middleware, web, App,
};

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod services;
pub mod session;
pub mod state;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

use config::Config;
use state::AppState;

pub const SESSION_COOKIE_NAME: &str = "session";

/// Cookie-backed sessions signed and encrypted with `key`.
pub fn session_middleware(key: Key, cookie_secure: bool) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name(SESSION_COOKIE_NAME.to_string())
        .cookie_secure(cookie_secure)
        .cookie_same_site(SameSite::Lax)
        .cookie_http_only(true)
        .build()
}

/// Session key from the configuration, or a fresh random one.
pub fn session_key(config: &Config) -> Key {
    match config.session_key_bytes().map(Key::try_from) {
        Some(Ok(key)) => key,
        Some(Err(e)) => {
            log::warn!("SESSION_KEY rejected ({}); using an ephemeral key", e);
            Key::generate()
        }
        None => {
            log::warn!(
                "SESSION_KEY not set; using an ephemeral key, sessions will not survive a restart"
            );
            Key::generate()
        }
    }
}

/// Builds the application with every route, the session layer and access
/// logging.
pub fn build_app(
    state: AppState,
    sessions: SessionMiddleware<CookieSessionStore>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .wrap(sessions)
        .wrap(middleware::Logger::default())
        .configure(handlers::configure)
}
