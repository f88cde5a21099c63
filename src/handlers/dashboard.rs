use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::AppError;
use crate::handlers::{flash_redirect, non_blank, render, views};
use crate::services::accounts::{self, Profile};
use crate::session::{FlashLevel, SessionContext};
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct ProfileForm {
    #[serde(default)]
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip: Option<String>,
}

impl From<ProfileForm> for Profile {
    fn from(form: ProfileForm) -> Self {
        Profile {
            username: form.username,
            first_name: non_blank(form.first_name),
            last_name: non_blank(form.last_name),
            city: non_blank(form.city),
            state: non_blank(form.state),
            country: non_blank(form.country),
            zip: non_blank(form.zip),
        }
    }
}

pub async fn show(
    state: web::Data<AppState>,
    session: SessionContext,
) -> Result<HttpResponse, AppError> {
    let user_id = session.require_user_id()?;

    // The account may be gone while the cookie lives on.
    let Some(user) = accounts::find_user(&state.pool, user_id).await? else {
        session.log_out();
        return Err(AppError::LoginRequired);
    };

    let orders = accounts::orders_for_user(&state.pool, user.id).await?;
    render(&session, "Dashboard", &views::dashboard(&user, &orders))
}

pub async fn update(
    state: web::Data<AppState>,
    session: SessionContext,
    form: web::Form<ProfileForm>,
) -> Result<HttpResponse, AppError> {
    let user_id = session.require_user_id()?;

    match accounts::update_profile(&state.pool, user_id, form.into_inner().into()).await {
        Ok(_) => flash_redirect(
            &session,
            FlashLevel::Success,
            "Profile updated successfully!",
            "/dashboard",
        ),
        Err(e) if e.is_validation() => {
            flash_redirect(&session, FlashLevel::Danger, e.to_string(), "/dashboard")
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{body_text, call, location, logged_in, test_app, TestClient};
    use actix_web::http::StatusCode;
    use actix_web::test;

    #[actix_web::test]
    async fn dashboard_requires_login() {
        let app = test_app().await;
        let mut client = TestClient::default();

        let res = call(&app, &mut client, test::TestRequest::get().uri("/dashboard")).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/login");
    }

    #[actix_web::test]
    async fn profile_edit_is_saved_and_escaped() {
        let app = test_app().await;
        let mut client = logged_in(&app).await;

        let res = call(
            &app,
            &mut client,
            test::TestRequest::post().uri("/dashboard").set_form([
                ("username", "ada"),
                ("city", "<Leeds>"),
                ("country", "UK"),
                ("zip", ""),
            ]),
        )
        .await;
        assert_eq!(location(&res), "/dashboard");

        let res = call(&app, &mut client, test::TestRequest::get().uri("/dashboard")).await;
        let body = body_text(res).await;
        assert!(body.contains("Profile updated successfully!"));
        assert!(body.contains(r#"value="&lt;Leeds&gt;""#));
        assert!(body.contains(r#"value="UK""#));
        assert!(body.contains("You have not placed any orders yet."));
    }
}
