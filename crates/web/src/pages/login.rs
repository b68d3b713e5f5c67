use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use directory::{
    auth::{AuthGateway, IdentityProvider},
    database::Database,
};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::{
    common::RouteResult,
    middleware::session::{access_token, remove_session_cookie, resolve_session, session_cookie},
    WebState,
};

pub const ADMIN_PATH: &str = "/admin";

#[derive(Debug, Deserialize)]
pub(crate) struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
struct LoginView<'a> {
    email: &'a str,
    error: Option<String>,
}

/// Signed in administrators go straight to the dashboard.
pub(crate) async fn form<D: Database, P: IdentityProvider>(
    State(WebState {
        identity,
        templates,
        ..
    }): State<WebState<D, P>>,
    cookies: Cookies,
) -> RouteResult<Response> {
    let token = access_token(&cookies, None);
    if token.is_some() && resolve_session(identity, token.as_deref()).await.is_some() {
        return Ok(Redirect::to(ADMIN_PATH).into_response());
    }

    let view = LoginView {
        email: "",
        error: None,
    };
    templates
        .render("login.html", &view)
        .map(IntoResponse::into_response)
}

pub(crate) async fn submit<D: Database, P: IdentityProvider>(
    State(WebState {
        identity,
        templates,
        ..
    }): State<WebState<D, P>>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> RouteResult<Response> {
    let email = form.email.trim();
    let mut gateway = AuthGateway::new(identity);
    match gateway.sign_in(email, &form.password).await {
        Ok(session) => {
            cookies.add(session_cookie(session.access_token.clone()));
            Ok(Redirect::to(ADMIN_PATH).into_response())
        }
        Err(why) => {
            let view = LoginView {
                email,
                error: Some(why.to_string()),
            };
            let page = templates.render("login.html", &view)?;
            Ok((StatusCode::UNAUTHORIZED, page).into_response())
        }
    }
}

pub(crate) async fn logout<D: Database, P: IdentityProvider>(
    State(WebState { identity, .. }): State<WebState<D, P>>,
    cookies: Cookies,
) -> Redirect {
    let token = access_token(&cookies, None);
    let mut gateway = AuthGateway::new(identity);
    if gateway.get_session(token.as_deref()).await.is_some() {
        gateway.sign_out().await;
    }
    remove_session_cookie(&cookies);
    Redirect::to("/")
}
