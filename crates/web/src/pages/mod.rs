use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use directory::{auth::IdentityProvider, database::Database};
use serde::Serialize;

use crate::WebState;

pub mod admin;
pub mod listing;
pub mod login;

pub fn routes<D: Database, P: IdentityProvider>(state: WebState<D, P>) -> Router {
    Router::new()
        .route("/", get(listing::index::<D, P>))
        .route("/fragments/pharmacies", get(listing::fragment::<D, P>))
        .route("/login", get(login::form::<D, P>).post(login::submit::<D, P>))
        .route("/logout", post(login::logout::<D, P>))
        .nest("/admin", admin::routes(state.clone()))
        .fallback(not_found::<D, P>)
        .with_state(state)
}

#[derive(Serialize)]
struct NotFoundView<'a> {
    path: &'a str,
}

async fn not_found<D: Database, P: IdentityProvider>(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { templates, .. }): State<WebState<D, P>>,
) -> Response {
    let view = NotFoundView {
        path: original_uri.path(),
    };
    match templates.render("not_found.html", &view) {
        Ok(page) => (StatusCode::NOT_FOUND, page).into_response(),
        Err(why) => why.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::testing::{app, database, get, send};

    #[tokio::test]
    async fn unknown_pages_render_the_not_found_page() {
        let app = app(database());

        let (status, _, body) = send(&app, get("/pharmacie-inconnue")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("pharmacie-inconnue"));
    }

    #[tokio::test]
    async fn static_files_are_served() {
        let app = app(database());

        let (status, _, body) = send(&app, get("/static/style.css")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(".card"));
    }
}
