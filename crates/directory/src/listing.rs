use chrono::NaiveDate;
use model::{
    detail::PharmacyDetail,
    filter::{PharmacyFilter, ALL_CITIES, ALL_REGIONS},
    pharmacy::Pharmacy,
    WithId,
};
use utility::id::Id;

use crate::{
    client::{Client, MAX_PAGE_SIZE},
    database::Database,
    RequestResult,
};

pub const DEFAULT_PAGE_SIZE: usize = 6;

/// Viewports narrower than this load further pages on scroll.
pub const MOBILE_BREAKPOINT: u32 = 768;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewport {
    Mobile,
    Desktop,
}

impl Viewport {
    pub fn from_width(width: u32) -> Self {
        if width < MOBILE_BREAKPOINT {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }
}

/// State of the public pharmacy listing: the active filters, the pages
/// loaded so far and the region and city choices.
pub struct ListingPage<D: Database> {
    client: Client<D>,
    page_size: usize,
    filter: PharmacyFilter,
    pharmacies: Vec<WithId<Pharmacy>>,
    loaded_pages: usize,
    has_more: bool,
    loading: bool,
    loading_more: bool,
    regions: Vec<String>,
    cities: Vec<String>,
}

impl<D: Database> ListingPage<D> {
    pub fn new(client: Client<D>, page_size: usize) -> Self {
        Self {
            client,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            filter: PharmacyFilter::new(),
            pharmacies: Vec::new(),
            loaded_pages: 0,
            has_more: true,
            loading: false,
            loading_more: false,
            regions: vec![ALL_REGIONS.to_owned()],
            cities: vec![ALL_CITIES.to_owned()],
        }
    }

    pub fn filter(&self) -> &PharmacyFilter {
        &self.filter
    }

    pub fn pharmacies(&self) -> &[WithId<Pharmacy>] {
        &self.pharmacies
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn cities(&self) -> &[String] {
        &self.cities
    }

    pub fn selected_region(&self) -> &str {
        self.filter.region.as_deref().unwrap_or(ALL_REGIONS)
    }

    pub fn selected_city(&self) -> &str {
        self.filter.city.as_deref().unwrap_or(ALL_CITIES)
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn loaded_pages(&self) -> usize {
        self.loaded_pages
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_loading_more(&self) -> bool {
        self.loading_more
    }

    pub async fn init(&mut self) -> RequestResult<()> {
        self.regions = self.client.list_regions().await?;
        self.cities = self
            .client
            .list_cities(self.filter.region.as_deref())
            .await?;
        self.apply(self.filter.clone()).await
    }

    pub async fn set_search(&mut self, term: Option<&str>) -> RequestResult<()> {
        self.apply(self.filter.clone().search(term)).await
    }

    /// Selects a region, resets the city and narrows the city choices.
    pub async fn set_region(&mut self, region: Option<&str>) -> RequestResult<()> {
        let filter = self.filter.clone().region(region).city(None);
        let cities = self.client.list_cities(filter.region.as_deref()).await?;
        self.apply(filter).await?;
        self.cities = cities;
        Ok(())
    }

    pub async fn set_city(&mut self, city: Option<&str>) -> RequestResult<()> {
        self.apply(self.filter.clone().city(city)).await
    }

    pub async fn set_duty_only(&mut self, duty_only: bool) -> RequestResult<()> {
        self.apply(self.filter.clone().duty_only(duty_only)).await
    }

    /// Clears every filter.
    pub async fn reset(&mut self) -> RequestResult<()> {
        let cities = self.client.list_cities(None).await?;
        self.apply(PharmacyFilter::new()).await?;
        self.cities = cities;
        Ok(())
    }

    /// Rebuilds the listing for `filter` with the first `pages` pages loaded.
    /// A city outside the selected region is dropped.
    pub async fn restore(&mut self, filter: PharmacyFilter, pages: usize) -> RequestResult<()> {
        let regions = self.client.list_regions().await?;
        let cities = self.client.list_cities(filter.region.as_deref()).await?;

        let mut filter = filter;
        let outside = filter
            .city
            .as_ref()
            .map_or(false, |city| !cities.contains(city));
        if outside {
            log::debug!("dropping city outside of the selected region");
            filter.city = None;
        }

        self.loading = true;
        let result = self.fetch_pages(&filter, pages.max(1)).await;
        self.loading = false;
        let (pharmacies, loaded_pages, has_more) = result?;

        self.regions = regions;
        self.cities = cities;
        self.filter = filter;
        self.pharmacies = pharmacies;
        self.loaded_pages = loaded_pages;
        self.has_more = has_more;
        Ok(())
    }

    /// Prepares the listing to fetch the page after `loaded_pages` without
    /// fetching the earlier ones again.
    pub fn resume(&mut self, filter: PharmacyFilter, loaded_pages: usize) {
        self.filter = filter;
        self.pharmacies.clear();
        self.loaded_pages = loaded_pages;
        self.has_more = true;
    }

    /// Appends the next page. Returns the number of appended pharmacies, zero
    /// while another page is loading or after the last page.
    pub async fn load_more(&mut self) -> RequestResult<usize> {
        if self.loading || self.loading_more || !self.has_more {
            return Ok(0);
        }

        self.loading_more = true;
        let result = self
            .client
            .list_pharmacies(self.loaded_pages, self.page_size, &self.filter)
            .await;
        self.loading_more = false;

        let page = result?;
        let appended = page.len();
        self.has_more = appended == self.page_size;
        self.pharmacies.extend(page);
        self.loaded_pages += 1;
        Ok(appended)
    }

    /// Infinite scroll only loads by itself on small screens.
    pub async fn on_sentinel_visible(&mut self, viewport: Viewport) -> RequestResult<usize> {
        match viewport {
            Viewport::Mobile => self.load_more().await,
            Viewport::Desktop => Ok(0),
        }
    }

    pub fn shows_load_more_button(&self, viewport: Viewport) -> bool {
        viewport == Viewport::Desktop && self.has_more && !self.pharmacies.is_empty()
    }

    pub fn select(&self, id: &Id<Pharmacy>, today: NaiveDate) -> Option<PharmacyDetail> {
        self.pharmacies
            .iter()
            .find(|pharmacy| &pharmacy.id == id)
            .map(|pharmacy| PharmacyDetail::new(pharmacy, today))
    }

    /// Fetches up to `pages` pages, stopping early after a short one.
    async fn fetch_pages(
        &self,
        filter: &PharmacyFilter,
        pages: usize,
    ) -> RequestResult<(Vec<WithId<Pharmacy>>, usize, bool)> {
        let mut pharmacies = Vec::new();
        let mut loaded_pages = 0;
        let mut has_more = true;
        while has_more && loaded_pages < pages {
            let page = self
                .client
                .list_pharmacies(loaded_pages, self.page_size, filter)
                .await?;
            has_more = page.len() == self.page_size;
            pharmacies.extend(page);
            loaded_pages += 1;
        }
        Ok((pharmacies, loaded_pages, has_more))
    }

    /// Fetches the first page for `filter` and only then replaces the state.
    async fn apply(&mut self, filter: PharmacyFilter) -> RequestResult<()> {
        self.loading = true;
        let result = self
            .client
            .list_pharmacies(0, self.page_size, &filter)
            .await;
        self.loading = false;

        let page = result?;
        self.has_more = page.len() == self.page_size;
        self.pharmacies = page;
        self.loaded_pages = 1;
        self.filter = filter;
        Ok(())
    }
}
