pub use crate::common::RouteResult;

use std::sync::Arc;

use axum::Router;
use config::Config;
use directory::{auth::IdentityProvider, client::Client, database::Database};
use templates::Templates;
use tokio::net::TcpListener;
use tower_cookies::CookieManagerLayer;
use tower_http::{services::ServeDir, trace::TraceLayer};

pub mod api;
pub mod common;
pub mod config;
pub mod hateoas;
pub mod middleware;
pub mod pages;
pub mod templates;

#[cfg(test)]
mod testing;

/// Shared by every handler. Cheap to clone.
pub struct WebState<D: Database, P: IdentityProvider> {
    pub client: Client<D>,
    pub identity: P,
    pub templates: Arc<Templates>,
    pub page_size: usize,
}

impl<D: Database, P: IdentityProvider> Clone for WebState<D, P> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            identity: self.identity.clone(),
            templates: self.templates.clone(),
            page_size: self.page_size,
        }
    }
}

impl<D: Database, P: IdentityProvider> WebState<D, P> {
    pub fn new(database: D, identity: P, page_size: usize) -> Result<Self, tera::Error> {
        Ok(Self {
            client: Client::new(database),
            identity,
            templates: Arc::new(Templates::load()?),
            page_size,
        })
    }
}

pub fn router<D: Database, P: IdentityProvider>(
    state: WebState<D, P>,
    static_dir: &str,
) -> Router {
    Router::new()
        .nest_service("/api", api::routes(state.clone()))
        .nest_service("/static", ServeDir::new(static_dir))
        .merge(pages::routes(state))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
}

pub async fn start_web_server<D: Database, P: IdentityProvider>(
    config: Config,
    state: WebState<D, P>,
) -> std::io::Result<()> {
    let routes = router(state, &config.static_dir);

    let listener = TcpListener::bind(config.listen_address).await?;
    log::info!("listening on {}", config.listen_address);
    axum::serve(listener, routes.into_make_service()).await?;

    Ok(())
}
