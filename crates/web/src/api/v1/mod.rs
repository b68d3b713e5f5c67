use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Query, State},
    http::Method,
    routing::{get, on},
    Extension, Router,
};
use directory::{auth::IdentityProvider, database::Database};
use serde::Deserialize;
use utility::serde::empty_as_none;

use crate::{
    common::{route_not_found, HateoasResult, RouteErrorResponse, VecResponse, METHOD_FILTER_ALL},
    hateoas,
    middleware::base_url::{base_url_middleware, BaseUrl},
    WebState,
};

pub(crate) mod admin;
pub(crate) mod auth;
pub(crate) mod pharmacies;

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::resource!("/v1{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes<D: Database, P: IdentityProvider>(state: WebState<D, P>) -> Router {
    Router::new()
        .route("/regions", get(get_regions::<D, P>))
        .route("/cities", get(get_cities::<D, P>))
        .nest_service("/pharmacies", pharmacies::routes(state.clone()))
        .nest_service("/auth", auth::routes(state.clone()))
        .nest_service("/admin", admin::routes(state.clone()))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

/// Distinct regions, sorted, without the "all regions" entry.
async fn get_regions<D: Database, P: IdentityProvider>(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D, P>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VecResponse<String>> {
    client
        .list_regions()
        .await
        .map(|regions| {
            // drop the sentinel the ui shows in front
            let regions = regions.into_iter().skip(1).collect();
            hateoas::Response::builder(VecResponse::non_paginated(regions), base_url)
                .link("self", resource!("/regions"))
                .link("cities", resource!("/cities"))
                .build()
                .json()
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

#[derive(Debug, Deserialize)]
pub(crate) struct CitiesQuery {
    #[serde(default, deserialize_with = "empty_as_none::deserialize")]
    region: Option<String>,
}

/// Distinct cities, sorted, restricted to one region if given.
async fn get_cities<D: Database, P: IdentityProvider>(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D, P>>,
    Query(params): Query<CitiesQuery>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VecResponse<String>> {
    client
        .list_cities(params.region.as_deref())
        .await
        .map(|cities| {
            let cities = cities.into_iter().skip(1).collect();
            hateoas::Response::builder(VecResponse::non_paginated(cities), base_url)
                .link("self", resource!("/cities"))
                .link("regions", resource!("/regions"))
                .build()
                .json()
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}
