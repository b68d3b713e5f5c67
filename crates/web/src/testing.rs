use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use directory::{
    auth::{AuthError, AuthResult, IdentityProvider, Session, User},
    database::memory::MemoryDatabase,
};
use model::pharmacy::Pharmacy;
use tower::ServiceExt;

use crate::{middleware::session::SESSION_COOKIE, router, WebState};

pub const EMAIL: &str = "admin@pharmabenin.bj";
pub const PASSWORD: &str = "motdepasse";
pub const TOKEN: &str = "jeton-admin";

/// Knows a single administrator account.
#[derive(Clone, Default)]
pub struct MockProvider;

fn admin() -> User {
    User {
        id: "admin-1".to_owned(),
        email: Some(EMAIL.to_owned()),
    }
}

#[async_trait]
impl IdentityProvider for MockProvider {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<Session> {
        if email == EMAIL && password == PASSWORD {
            Ok(Session {
                access_token: TOKEN.to_owned(),
                refresh_token: None,
                expires_at: None,
                user: admin(),
            })
        } else {
            Err(AuthError::provider("Invalid login credentials"))
        }
    }

    async fn user(&self, access_token: &str) -> AuthResult<User> {
        if access_token == TOKEN {
            Ok(admin())
        } else {
            Err(AuthError::Unauthorized)
        }
    }

    async fn sign_out(&self, _access_token: &str) -> AuthResult<()> {
        Ok(())
    }
}

fn date(day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2026, 1, day)
}

pub fn pharmacy(name: &str, region: &str, city: &str, is_24h: bool) -> Pharmacy {
    Pharmacy {
        name: name.to_owned(),
        neighborhood: "Centre".to_owned(),
        city: Some(city.to_owned()),
        region: region.to_owned(),
        phone: "+229 21 30 00 00 / +229 97 00 00 00".to_owned(),
        is_24h,
        start_date: if is_24h { None } else { date(3) },
        end_date: if is_24h { None } else { date(10) },
        group_name: None,
        latitude: None,
        longitude: None,
        hours: None,
        services: vec![],
    }
}

/// Eight pharmacies over three regions, three of them open around the clock.
pub fn database() -> MemoryDatabase {
    MemoryDatabase::with_pharmacies([
        pharmacy("Pharmacie Akpakpa", "Littoral", "Cotonou", true),
        pharmacy("Pharmacie Bénin", "Littoral", "Cotonou", false),
        pharmacy("Pharmacie Camp Guézo", "Littoral", "Cotonou", false),
        pharmacy("Pharmacie Djèdjè", "Ouémé", "Porto-Novo", true),
        pharmacy("Pharmacie Ekpè", "Ouémé", "Sèmè-Kpodji", false),
        pharmacy("Pharmacie Fidjrossè", "Littoral", "Cotonou", false),
        pharmacy("Pharmacie Godomey", "Atlantique", "Abomey-Calavi", true),
        pharmacy("Pharmacie Houéyiho", "Littoral", "Cotonou", false),
    ])
}

pub fn app(database: MemoryDatabase) -> Router {
    let state = WebState::new(database, MockProvider, 6).unwrap();
    router(state, concat!(env!("CARGO_MANIFEST_DIR"), "/resources/www"))
}

pub fn session_cookie() -> String {
    format!("{}={}", SESSION_COOKIE, TOKEN)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn get_signed_in(uri: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::COOKIE, session_cookie())
        .body(Body::empty())
        .unwrap()
}

pub fn post_form(uri: &str, form: &str, signed_in: bool) -> Request<Body> {
    let mut request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if signed_in {
        request = request.header(header::COOKIE, session_cookie());
    }
    request.body(Body::from(form.to_owned())).unwrap()
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value, signed_in: bool) -> Request<Body> {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if signed_in {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", TOKEN));
    }
    request.body(Body::from(body.to_string())).unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8(body.to_vec()).unwrap())
}

pub async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let (status, _, body) = send(app, request).await;
    (status, serde_json::from_str(&body).unwrap_or(serde_json::Value::Null))
}
