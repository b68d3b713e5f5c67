use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::Method,
    routing::{get, on},
    Extension, Router,
};
use chrono::Local;
use directory::{auth::IdentityProvider, client::MAX_PAGE_SIZE, database::Database};
use model::{detail::PharmacyDetail, filter::PharmacyFilter, pharmacy::Pharmacy, WithId};
use serde::{Deserialize, Serialize};
use utility::{
    id::Id,
    let_also::LetAlso,
    serde::{checkbox, empty_as_none},
};

use crate::{
    common::{
        route_not_found, schema, HateoasResult, RouteErrorResponse, VecResponse,
        METHOD_FILTER_ALL,
    },
    hateoas,
    middleware::base_url::{base_url_middleware, BaseUrl},
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/pharmacies{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes<D: Database, P: IdentityProvider>(state: WebState<D, P>) -> Router {
    Router::new()
        .route("/schema", get(schema::<Pharmacy>))
        .route("/:id", get(get_pharmacy::<D, P>))
        .route("/", get(get_pharmacies::<D, P>))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

/// Zero based page of the public listing.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PharmaciesQuery {
    #[serde(default)]
    pub page: usize,

    pub page_size: Option<usize>,

    #[serde(default, deserialize_with = "empty_as_none::deserialize")]
    pub search: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none::deserialize")]
    pub region: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none::deserialize")]
    pub city: Option<String>,

    #[serde(
        default,
        deserialize_with = "checkbox::deserialize",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub duty_only: bool,
}

impl PharmaciesQuery {
    fn filter(&self) -> PharmacyFilter {
        PharmacyFilter::new()
            .search(self.search.as_deref())
            .region(self.region.as_deref())
            .city(self.city.as_deref())
            .duty_only(self.duty_only)
    }

    fn with_page(&self, page: usize, page_size: usize) -> String {
        Self {
            page,
            page_size: Some(page_size),
            ..self.clone()
        }
        .let_owned(|query| serde_urlencoded::to_string(query).unwrap_or_default())
    }
}

async fn get_pharmacies<D: Database, P: IdentityProvider>(
    OriginalUri(original_uri): OriginalUri,
    State(WebState {
        client, page_size, ..
    }): State<WebState<D, P>>,
    Query(params): Query<PharmaciesQuery>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VecResponse<hateoas::Response<WithId<Pharmacy>>>> {
    let page_size = params.page_size.unwrap_or(page_size).clamp(1, MAX_PAGE_SIZE);
    client
        .list_pharmacies(params.page, page_size, &params.filter())
        .await
        .map(|pharmacies| {
            let response = pharmacies
                .into_iter()
                .map(|pharmacy| pharmacy_hateoas(pharmacy, base_url.clone()))
                .collect::<Vec<_>>()
                .let_owned(|data| VecResponse::paginated(data, params.page, page_size));
            let next = response
                .pagination
                .as_ref()
                .filter(|pagination| pagination.has_more)
                .map(|_| resource!("?{}", params.with_page(params.page + 1, page_size)));

            hateoas::Response::builder(response, base_url)
                .link("self", resource!("?{}", params.with_page(params.page, page_size)))
                .link_option("next", next)
                .link("schema", resource!("/schema"))
                .build()
                .json()
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

/// Everything the detail overlay shows, duty status evaluated for today.
async fn get_pharmacy<D: Database, P: IdentityProvider>(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D, P>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<PharmacyDetail> {
    let today = Local::now().date_naive();
    client
        .get_pharmacy(&Id::new(id))
        .await
        .map(|pharmacy| {
            hateoas::Response::builder(PharmacyDetail::new(&pharmacy, today), base_url)
                .link("self", resource!("/{}", pharmacy.id.raw()))
                .build()
                .json()
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

pub(crate) fn pharmacy_hateoas(
    pharmacy: WithId<Pharmacy>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<WithId<Pharmacy>> {
    let id = pharmacy.id.raw();
    hateoas::Response::builder(pharmacy, base_url)
        .link("self", resource!("/{}", id))
        .build()
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::testing::{app, database, get, send_json};

    #[tokio::test]
    async fn pages_through_the_listing() {
        let app = app(database());

        let (status, first) = send_json(&app, get("/api/v1/pharmacies?pageSize=5")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["data"].as_array().unwrap().len(), 5);
        assert_eq!(first["pagination"]["hasMore"], true);
        assert_eq!(first["data"][0]["name"], "Pharmacie Akpakpa");
        let next = first["links"]
            .as_array()
            .unwrap()
            .iter()
            .find(|link| link["rel"] == "next")
            .unwrap();
        assert!(next["href"].as_str().unwrap().ends_with("page=1&pageSize=5"));

        let (_, second) = send_json(&app, get("/api/v1/pharmacies?page=1&pageSize=5")).await;
        assert_eq!(second["data"].as_array().unwrap().len(), 3);
        assert_eq!(second["pagination"]["hasMore"], false);
        assert!(second["links"]
            .as_array()
            .unwrap()
            .iter()
            .all(|link| link["rel"] != "next"));
    }

    #[tokio::test]
    async fn filters_apply_before_paging() {
        let app = app(database());

        let (_, body) = send_json(
            &app,
            get("/api/v1/pharmacies?region=Littoral&dutyOnly=true&search=akpa"),
        )
        .await;
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["name"], "Pharmacie Akpakpa");

        let (_, body) = send_json(
            &app,
            get("/api/v1/pharmacies?pageSize=20&region=Toutes%20les%20r%C3%A9gions"),
        )
        .await;
        assert_eq!(body["data"].as_array().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn detail_and_missing_pharmacy() {
        let app = app(database());

        let (_, page) = send_json(&app, get("/api/v1/pharmacies?search=DJ%C3%88DJ%C3%88")).await;
        let id = page["data"][0]["id"].as_str().unwrap().to_owned();

        let (status, detail) = send_json(&app, get(&format!("/api/v1/pharmacies/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["onDuty"], true);
        assert_eq!(detail["callUri"], "tel:+22921300000");
        assert_eq!(detail["serviceType"], "Ouvert 24h/24 et 7j/7");

        let (status, body) = send_json(&app, get("/api/v1/pharmacies/inconnue")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["requestedUri"], "/api/v1/pharmacies/inconnue");
    }
}
