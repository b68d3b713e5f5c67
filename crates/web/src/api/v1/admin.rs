use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{Method, StatusCode},
    routing::{get, on, put},
    Extension, Json, Router,
};
use directory::{auth::IdentityProvider, database::Database};
use model::{
    pharmacy::{Pharmacy, PharmacyDraft},
    stats::PharmacyStats,
    WithId,
};
use serde::Deserialize;
use utility::{id::Id, let_also::LetAlso};

use super::pharmacies::pharmacy_hateoas;
use crate::{
    common::{
        route_not_found, HateoasResult, RouteErrorResponse, RouteResult, VecResponse,
        METHOD_FILTER_ALL,
    },
    hateoas,
    middleware::{
        base_url::{base_url_middleware, BaseUrl},
        session::require_api_session,
    },
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/admin{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes<D: Database, P: IdentityProvider>(state: WebState<D, P>) -> Router {
    Router::new()
        .route("/stats", get(get_stats::<D, P>))
        .route(
            "/pharmacies/:id",
            put(update_pharmacy::<D, P>).delete(delete_pharmacy::<D, P>),
        )
        .route(
            "/pharmacies",
            get(get_pharmacies::<D, P>).post(create_pharmacy::<D, P>),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_api_session::<D, P>,
        ))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

fn request_failed(why: directory::RequestError, method: &Method, uri: &str) -> RouteErrorResponse {
    RouteErrorResponse::from(why)
        .with_method(method)
        .with_uri(uri)
}

async fn get_stats<D: Database, P: IdentityProvider>(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D, P>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<PharmacyStats> {
    client
        .compute_stats()
        .await
        .map(|stats| {
            hateoas::Response::builder(stats, base_url)
                .link("self", resource!("/stats"))
                .link("pharmacies", resource!("/pharmacies"))
                .build()
                .json()
        })
        .map_err(|why| request_failed(why, &Method::GET, original_uri.path()))
}

/// Every pharmacy, ordered by name. The dashboard filters client side.
async fn get_pharmacies<D: Database, P: IdentityProvider>(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D, P>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VecResponse<hateoas::Response<WithId<Pharmacy>>>> {
    client
        .list_all_pharmacies()
        .await
        .map(|pharmacies| {
            pharmacies
                .into_iter()
                .map(|pharmacy| pharmacy_hateoas(pharmacy, base_url.clone()))
                .collect::<Vec<_>>()
                .let_owned(|data| VecResponse::non_paginated(data).hateoas().json())
        })
        .map_err(|why| request_failed(why, &Method::GET, original_uri.path()))
}

async fn create_pharmacy<D: Database, P: IdentityProvider>(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D, P>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(draft): Json<PharmacyDraft>,
) -> RouteResult<(StatusCode, Json<hateoas::Response<WithId<Pharmacy>>>)> {
    client
        .create_pharmacy(draft)
        .await
        .map(|created| (StatusCode::CREATED, pharmacy_hateoas(created, base_url).json()))
        .map_err(|why| request_failed(why, &Method::POST, original_uri.path()))
}

async fn update_pharmacy<D: Database, P: IdentityProvider>(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D, P>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(draft): Json<PharmacyDraft>,
) -> HateoasResult<WithId<Pharmacy>> {
    client
        .update_pharmacy(&Id::new(id), draft)
        .await
        .map(|updated| pharmacy_hateoas(updated, base_url).json())
        .map_err(|why| request_failed(why, &Method::PUT, original_uri.path()))
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteQuery {
    #[serde(default)]
    confirm: bool,
}

/// Deletion is irreversible and has to be confirmed with `?confirm=true`.
async fn delete_pharmacy<D: Database, P: IdentityProvider>(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D, P>>,
    Query(params): Query<DeleteQuery>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<WithId<Pharmacy>> {
    if !params.confirm {
        return Err(RouteErrorResponse::new(StatusCode::CONFLICT)
            .with_method(&Method::DELETE)
            .with_uri(original_uri.path())
            .with_message("Deleting a pharmacy has to be confirmed with confirm=true."));
    }
    client
        .delete_pharmacy(&Id::new(id))
        .await
        .map(|deleted| pharmacy_hateoas(deleted, base_url).json())
        .map_err(|why| request_failed(why, &Method::DELETE, original_uri.path()))
}
