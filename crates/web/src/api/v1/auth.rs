use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, on, post},
    Json, Router,
};
use axum_extra::TypedHeader;
use chrono::{DateTime, Utc};
use directory::{
    auth::{AuthGateway, IdentityProvider, Session, User},
    database::Database,
};
use headers::{authorization::Bearer, Authorization};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::{
    common::{route_not_found, RouteErrorResponse, RouteResult, METHOD_FILTER_ALL},
    middleware::session::{access_token, remove_session_cookie, resolve_session, session_cookie},
    WebState,
};

pub(crate) fn routes<D: Database, P: IdentityProvider>(state: WebState<D, P>) -> Router {
    Router::new()
        .route("/session", get(get_session::<D, P>))
        .route("/sign-in", post(sign_in::<D, P>))
        .route("/sign-out", post(sign_out::<D, P>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Debug, Deserialize)]
pub(crate) struct Credentials {
    email: String,
    password: String,
}

/// The session as exposed to clients, the refresh token stays server side.
#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionDto {
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
    user: User,
}

impl From<Session> for SessionDto {
    fn from(session: Session) -> Self {
        Self {
            access_token: session.access_token,
            expires_at: session.expires_at,
            user: session.user,
        }
    }
}

async fn get_session<D: Database, P: IdentityProvider>(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { identity, .. }): State<WebState<D, P>>,
    cookies: Cookies,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> RouteResult<Json<SessionDto>> {
    let token = access_token(&cookies, bearer.as_ref());
    resolve_session(identity, token.as_deref())
        .await
        .map(|session| Json(session.into()))
        .ok_or_else(|| {
            RouteErrorResponse::unauthorized()
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

/// Sets the session cookie on success. Every failure reads the same.
async fn sign_in<D: Database, P: IdentityProvider>(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { identity, .. }): State<WebState<D, P>>,
    cookies: Cookies,
    Json(credentials): Json<Credentials>,
) -> RouteResult<Json<SessionDto>> {
    let mut gateway = AuthGateway::new(identity);
    match gateway
        .sign_in(&credentials.email, &credentials.password)
        .await
    {
        Ok(session) => {
            let session = session.clone();
            cookies.add(session_cookie(session.access_token.clone()));
            Ok(Json(session.into()))
        }
        Err(why) => Err(RouteErrorResponse::from(why)
            .with_method(&Method::POST)
            .with_uri(original_uri.path())),
    }
}

async fn sign_out<D: Database, P: IdentityProvider>(
    State(WebState { identity, .. }): State<WebState<D, P>>,
    cookies: Cookies,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> impl IntoResponse {
    let token = access_token(&cookies, bearer.as_ref());
    let mut gateway = AuthGateway::new(identity);
    if gateway.get_session(token.as_deref()).await.is_some() {
        gateway.sign_out().await;
    }
    remove_session_cookie(&cookies);
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use axum::http::{header, StatusCode};
    use serde_json::json;

    use crate::testing::{app, database, json_request, send, send_json, EMAIL, PASSWORD, TOKEN};

    #[tokio::test]
    async fn failed_sign_in_is_generic() {
        let app = app(database());

        let (status, body) = send_json(
            &app,
            json_request(
                "POST",
                "/api/v1/auth/sign-in",
                json!({ "email": EMAIL, "password": "faux" }),
                false,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Identifiants invalides ou erreur de connexion.");
        assert!(body.get("detailedInformation").is_none());
    }

    #[tokio::test]
    async fn sign_in_sets_the_session_cookie() {
        let app = app(database());

        let (status, headers, body) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/auth/sign-in",
                json!({ "email": EMAIL, "password": PASSWORD }),
                false,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with(&format!("pharma_session={}", TOKEN)));
        assert!(cookie.contains("HttpOnly"));
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["user"]["email"], EMAIL);
        assert!(body.get("refreshToken").is_none());
    }

    #[tokio::test]
    async fn session_needs_a_valid_token() {
        let app = app(database());

        let (status, _) = send_json(
            &app,
            json_request("GET", "/api/v1/auth/session", json!({}), false),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send_json(
            &app,
            json_request("GET", "/api/v1/auth/session", json!({}), true),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["accessToken"], TOKEN);
    }
}
