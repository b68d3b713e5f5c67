use axum::{
    extract::{OriginalUri, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::TypedHeader;
use directory::{
    auth::{AuthGateway, IdentityProvider, Session},
    database::Database,
};
use headers::{authorization::Bearer, Authorization};
use tower_cookies::{cookie::SameSite, Cookie, Cookies};

use crate::{common::RouteErrorResponse, WebState};

/// Http only cookie holding the administrator's access token.
pub const SESSION_COOKIE: &str = "pharma_session";

pub const LOGIN_PATH: &str = "/login";

pub fn session_cookie(access_token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, access_token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn remove_session_cookie(cookies: &Cookies) {
    cookies.remove(Cookie::build(SESSION_COOKIE).path("/").build());
}

/// The bearer token wins over the cookie.
pub fn access_token(
    cookies: &Cookies,
    bearer: Option<&TypedHeader<Authorization<Bearer>>>,
) -> Option<String> {
    bearer
        .map(|TypedHeader(Authorization(bearer))| bearer.token().to_owned())
        .or_else(|| cookies.get(SESSION_COOKIE).map(|cookie| cookie.value().to_owned()))
}

pub async fn resolve_session<P: IdentityProvider>(
    provider: P,
    access_token: Option<&str>,
) -> Option<Session> {
    let mut gateway = AuthGateway::new(provider);
    gateway.get_session(access_token).await.cloned()
}

/// Lets json api requests through only with a valid session, answers 401
/// otherwise.
pub async fn require_api_session<D: Database, P: IdentityProvider>(
    State(state): State<WebState<D, P>>,
    OriginalUri(original_uri): OriginalUri,
    cookies: Cookies,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = access_token(&cookies, bearer.as_ref());
    match resolve_session(state.identity.clone(), token.as_deref()).await {
        Some(session) => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        None => RouteErrorResponse::unauthorized()
            .with_method(req.method())
            .with_uri(original_uri.path())
            .into_response(),
    }
}

/// Lets admin page requests through only with a valid session, redirects to
/// the login page otherwise.
pub async fn require_page_session<D: Database, P: IdentityProvider>(
    State(state): State<WebState<D, P>>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Response {
    let token = access_token(&cookies, None);
    match resolve_session(state.identity.clone(), token.as_deref()).await {
        Some(session) => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        None => {
            if token.is_some() {
                remove_session_cookie(&cookies);
            }
            Redirect::to(LOGIN_PATH).into_response()
        }
    }
}
