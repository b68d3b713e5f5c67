use axum::{
    extract::{Query, State},
    response::Html,
};
use chrono::{Local, NaiveDate};
use directory::{
    auth::IdentityProvider,
    client::Client,
    database::Database,
    listing::{ListingPage, Viewport, MOBILE_BREAKPOINT},
};
use model::{
    detail::PharmacyDetail,
    filter::{PharmacyFilter, ALL_CITIES, ALL_REGIONS},
};
use serde::{Deserialize, Serialize};
use utility::{
    id::Id,
    serde::{checkbox, empty_as_none},
};

use crate::{common::RouteResult, WebState};

/// Upper bound for `pages`, a reload never fetches more than this.
const MAX_RESTORED_PAGES: usize = 20;

const LOAD_FAILED: &str =
    "Impossible de charger les pharmacies pour le moment. Veuillez réessayer plus tard.";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListingParams {
    #[serde(default, deserialize_with = "empty_as_none::deserialize")]
    search: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none::deserialize")]
    region: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none::deserialize")]
    city: Option<String>,

    #[serde(default, deserialize_with = "checkbox::deserialize")]
    duty_only: bool,

    /// Number of pages shown, kept across reloads of the page.
    #[serde(default)]
    pages: Option<usize>,

    /// Id of the pharmacy shown in the detail overlay.
    #[serde(default, deserialize_with = "empty_as_none::deserialize")]
    selected: Option<String>,
}

impl ListingParams {
    fn filter(&self) -> PharmacyFilter {
        PharmacyFilter::new()
            .search(self.search.as_deref())
            .region(self.region.as_deref())
            .city(self.city.as_deref())
            .duty_only(self.duty_only)
    }
}

/// Where the infinite scroll continues.
#[derive(Debug, Deserialize)]
pub(crate) struct ScrollParams {
    /// Pages already shown.
    #[serde(default)]
    page: usize,
    /// Viewport width in css pixels.
    width: Option<u32>,
}

/// Query string of a listing link.
#[serde_with::skip_serializing_none]
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListingQuery<'a> {
    search: Option<&'a str>,
    region: Option<&'a str>,
    city: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    duty_only: bool,
    pages: Option<usize>,
    page: Option<usize>,
    selected: Option<&'a str>,
}

impl<'a> ListingQuery<'a> {
    fn new(filter: &'a PharmacyFilter) -> Self {
        Self {
            search: filter.search.as_deref(),
            region: filter.region.as_deref(),
            city: filter.city.as_deref(),
            duty_only: filter.duty_only,
            pages: None,
            page: None,
            selected: None,
        }
    }

    fn pages(mut self, pages: usize) -> Self {
        self.pages = (pages > 1).then_some(pages);
        self
    }

    fn page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    fn selected(mut self, id: &'a str) -> Self {
        self.selected = Some(id);
        self
    }

    fn to_url(&self, path: &str) -> String {
        match serde_urlencoded::to_string(self) {
            Ok(query) if !query.is_empty() => format!("{}?{}", path, query),
            _ => path.to_owned(),
        }
    }
}

#[derive(Serialize)]
struct CardView {
    #[serde(flatten)]
    detail: PharmacyDetail,
    url: String,
}

#[derive(Serialize)]
struct CardsView {
    cards: Vec<CardView>,
    next_fragment_url: Option<String>,
    end_of_list: bool,
}

impl CardsView {
    fn new<D: Database>(listing: &ListingPage<D>, today: NaiveDate) -> Self {
        let filter = listing.filter();
        let cards = listing
            .pharmacies()
            .iter()
            .map(|pharmacy| {
                let id = pharmacy.id.raw();
                CardView {
                    url: ListingQuery::new(filter)
                        .pages(listing.loaded_pages())
                        .selected(&id)
                        .to_url("/"),
                    detail: PharmacyDetail::new(pharmacy, today),
                }
            })
            .collect::<Vec<_>>();
        let next_fragment_url = listing.has_more().then(|| {
            ListingQuery::new(filter)
                .page(listing.loaded_pages())
                .to_url("/fragments/pharmacies")
        });

        Self {
            end_of_list: !listing.has_more() && !cards.is_empty(),
            cards,
            next_fragment_url,
        }
    }
}

#[derive(Serialize)]
struct ListingView<'a> {
    search: &'a str,
    regions: Vec<&'a str>,
    cities: Vec<&'a str>,
    selected_region: &'a str,
    selected_city: &'a str,
    all_regions: &'static str,
    duty_only: bool,
    #[serde(flatten)]
    cards: CardsView,
    load_more_url: Option<String>,
    close_url: String,
    notice: Option<&'static str>,
    selected: Option<PharmacyDetail>,
    mobile_breakpoint: u32,
}

fn with_fallback<'a>(values: &'a [String], sentinel: &'static str) -> Vec<&'a str> {
    if values.is_empty() {
        vec![sentinel]
    } else {
        values.iter().map(String::as_str).collect()
    }
}

/// The detail of a shown pharmacy, fetched separately when it is not part
/// of the shown pages.
async fn selected_detail<D: Database>(
    listing: &ListingPage<D>,
    client: &Client<D>,
    id: &str,
    today: NaiveDate,
) -> Option<PharmacyDetail> {
    let id = Id::new(id.to_owned());
    match listing.select(&id, today) {
        Some(detail) => Some(detail),
        None => client
            .get_pharmacy(&id)
            .await
            .ok()
            .map(|pharmacy| PharmacyDetail::new(&pharmacy, today)),
    }
}

pub(crate) async fn index<D: Database, P: IdentityProvider>(
    State(WebState {
        client,
        templates,
        page_size,
        ..
    }): State<WebState<D, P>>,
    Query(params): Query<ListingParams>,
) -> RouteResult<Html<String>> {
    let today = Local::now().date_naive();
    let requested = params.filter();
    let pages = params.pages.unwrap_or(1).clamp(1, MAX_RESTORED_PAGES);

    let mut listing = ListingPage::new(client.clone(), page_size);
    // failures are logged by the client
    let notice = listing
        .restore(requested.clone(), pages)
        .await
        .err()
        .map(|_| LOAD_FAILED);
    let filter = match notice {
        Some(_) => &requested,
        None => listing.filter(),
    };

    let selected = match params.selected.as_deref() {
        Some(id) => selected_detail(&listing, &client, id, today).await,
        None => None,
    };

    let view = ListingView {
        search: filter.search.as_deref().unwrap_or_default(),
        regions: with_fallback(listing.regions(), ALL_REGIONS),
        cities: with_fallback(listing.cities(), ALL_CITIES),
        selected_region: filter.region.as_deref().unwrap_or(ALL_REGIONS),
        selected_city: filter.city.as_deref().unwrap_or(ALL_CITIES),
        all_regions: ALL_REGIONS,
        duty_only: filter.duty_only,
        cards: CardsView::new(&listing, today),
        load_more_url: listing.shows_load_more_button(Viewport::Desktop).then(|| {
            ListingQuery::new(filter)
                .pages(listing.loaded_pages() + 1)
                .to_url("/")
        }),
        close_url: ListingQuery::new(filter)
            .pages(listing.loaded_pages())
            .to_url("/"),
        notice,
        selected,
        mobile_breakpoint: MOBILE_BREAKPOINT,
    };
    templates.render("index.html", &view)
}

/// The next page of cards for the infinite scroll sentinel. Small viewports
/// only, larger ones get an empty fragment and use the load more link.
pub(crate) async fn fragment<D: Database, P: IdentityProvider>(
    State(WebState {
        client,
        templates,
        page_size,
        ..
    }): State<WebState<D, P>>,
    Query(params): Query<ListingParams>,
    Query(scroll): Query<ScrollParams>,
) -> RouteResult<Html<String>> {
    let today = Local::now().date_naive();
    let viewport = scroll.width.map_or(Viewport::Mobile, Viewport::from_width);

    let mut listing = ListingPage::new(client, page_size);
    listing.resume(params.filter(), scroll.page);
    let appended = listing.on_sentinel_visible(viewport).await?;
    log::debug!("infinite scroll appended {} pharmacies", appended);

    templates.render("cards.html", &CardsView::new(&listing, today))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::testing::{app, database, get, send};

    fn cards(body: &str) -> usize {
        body.matches("<article class=\"card").count()
    }

    #[tokio::test]
    async fn first_page_with_load_more() {
        let app = app(database());

        let (status, _, body) = send(&app, get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cards(&body), 6);
        assert!(body.contains("Pharmacie Akpakpa"));
        assert!(!body.contains("Pharmacie Godomey"));
        assert!(body.contains("Voir plus de pharmacies"));
        assert!(body.contains("data-next=\"&#x2F;fragments&#x2F;pharmacies?page=1\""));
    }

    #[tokio::test]
    async fn restores_loaded_pages() {
        let app = app(database());

        let (_, _, body) = send(&app, get("/?pages=2")).await;
        assert_eq!(cards(&body), 8);
        assert!(!body.contains("Voir plus de pharmacies"));
        assert!(body.contains("Toutes les pharmacies ont été chargées."));
    }

    #[tokio::test]
    async fn city_outside_the_region_is_dropped() {
        let app = app(database());

        let (_, _, body) = send(&app, get("/?region=Ou%C3%A9m%C3%A9&city=Cotonou")).await;
        assert_eq!(cards(&body), 2);
        assert!(body.contains("<option value=\"Toutes les villes\" selected>"));
        assert!(body.contains("<option value=\"Porto-Novo\">"));
    }

    #[tokio::test]
    async fn duty_only_and_search() {
        let app = app(database());

        let (_, _, body) = send(&app, get("/?dutyOnly=on")).await;
        assert_eq!(cards(&body), 3);

        let (_, _, body) = send(&app, get("/?search=+GODOMEY+")).await;
        assert_eq!(cards(&body), 1);
        assert!(body.contains("value=\"GODOMEY\""));

        let (_, _, body) = send(&app, get("/?search=introuvable")).await;
        assert_eq!(cards(&body), 0);
        assert!(body.contains("Aucune pharmacie trouvée"));
    }

    #[tokio::test]
    async fn selected_pharmacy_opens_the_detail() {
        let database = database();
        let app = app(database.clone());

        let (_, _, body) = send(&app, get("/?search=godomey")).await;
        let start = body.find("selected=").unwrap() + "selected=".len();
        let id = &body[start..]
            .split(|c: char| c == '"' || c == '&')
            .next()
            .unwrap()
            .to_owned();

        let (_, _, body) = send(&app, get(&format!("/?selected={}", id))).await;
        assert!(body.contains("class=\"modal\""));
        assert!(body.contains("Appeler maintenant"));
        assert!(body.contains("href=\"tel:+22921300000\""));
        assert!(body.contains("Ouvert 24h&#x2F;24 et 7j&#x2F;7"));

        let (_, _, body) = send(&app, get("/?selected=inconnue")).await;
        assert!(!body.contains("class=\"modal\""));
    }

    #[tokio::test]
    async fn unavailable_store_shows_a_notice() {
        let database = database();
        database.set_unavailable(true);
        let app = app(database);

        let (status, _, body) = send(&app, get("/?search=akpakpa")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cards(&body), 0);
        assert!(body.contains("Impossible de charger les pharmacies"));
        assert!(body.contains("value=\"akpakpa\""));
    }

    #[tokio::test]
    async fn fragment_continues_on_small_screens_only() {
        let app = app(database());

        let (status, _, body) = send(&app, get("/fragments/pharmacies?page=1&width=375")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cards(&body), 2);
        assert!(!body.contains("data-next"));
        assert!(body.contains("pages=2"));

        let (_, _, body) = send(&app, get("/fragments/pharmacies?page=1&width=1280")).await;
        assert_eq!(cards(&body), 0);
    }
}
