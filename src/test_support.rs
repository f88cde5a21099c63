//! Helpers shared by the handler tests.

use std::fmt::Debug;

use actix_http::Request;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{
    body::MessageBody,
    cookie::{Cookie, Key},
    dev::{Service, ServiceResponse},
    http::header,
    test::{self, TestRequest},
};

use crate::db::init_memory_db;
use crate::services::catalog::tests::insert_medicine;
use crate::state::AppState;
use crate::{build_app, SESSION_COOKIE_NAME};

/// Session middleware with a fresh key and the `Secure` flag off so plain
/// HTTP test requests keep their cookie.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    crate::session_middleware(Key::generate(), false)
}

pub async fn test_state() -> AppState {
    let pool = init_memory_db().await.expect("in-memory database");
    AppState { pool, page_size: 2 }
}

/// Application over an in-memory database seeded with three medicines:
/// Aspirin (id 1, stock 10), Ibuprofen (id 2, stock 5), Paracetamol (id 3,
/// stock 1).
pub async fn test_app_with_state() -> (
    impl Service<
        Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    AppState,
) {
    let state = test_state().await;
    insert_medicine(&state.pool, 1, "Aspirin", 2.5, 10).await;
    insert_medicine(&state.pool, 2, "Ibuprofen", 4.0, 5).await;
    insert_medicine(&state.pool, 3, "Paracetamol", 1.25, 1).await;

    let app = test::init_service(build_app(state.clone(), test_session_middleware())).await;
    (app, state)
}

pub async fn test_app(
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error> {
    test_app_with_state().await.0
}

pub fn session_cookie<B>(res: &ServiceResponse<B>) -> Option<Cookie<'static>> {
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == SESSION_COOKIE_NAME)
        .map(|cookie| cookie.into_owned())
}

pub fn location<B>(res: &ServiceResponse<B>) -> String {
    res.headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Carries the session cookie from one request to the next, like a browser.
#[derive(Default)]
pub struct TestClient {
    cookie: Option<Cookie<'static>>,
}

pub async fn call<S, B, E>(
    app: &S,
    client: &mut TestClient,
    req: TestRequest,
) -> ServiceResponse<B>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = E>,
    E: Debug,
{
    let req = match &client.cookie {
        Some(cookie) => req.cookie(cookie.clone()),
        None => req,
    };

    let res = test::call_service(app, req.to_request()).await;
    if let Some(cookie) = session_cookie(&res) {
        client.cookie = (!cookie.value().is_empty()).then_some(cookie);
    }
    res
}

/// Registers the `ada` account and logs in with it. The returned client
/// holds the session cookie.
pub async fn logged_in<S, B, E>(app: &S) -> TestClient
where
    S: Service<Request, Response = ServiceResponse<B>, Error = E>,
    E: Debug,
{
    let mut client = TestClient::default();
    let credentials = [("username", "ada"), ("password", "pw")];
    let register = TestRequest::post().uri("/register").set_form(credentials);
    call(app, &mut client, register).await;
    let login = TestRequest::post().uri("/login").set_form(credentials);
    call(app, &mut client, login).await;
    client
}

pub async fn body_text<B>(res: ServiceResponse<B>) -> String
where
    B: MessageBody,
{
    String::from_utf8(test::read_body(res).await.to_vec()).expect("utf-8 body")
}
