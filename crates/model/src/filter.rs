use serde::{Deserialize, Serialize};
use utility::text::{contains_ignore_case, non_blank};

use crate::pharmacy::Pharmacy;

/// Value shown in front of the region list, selecting every region.
pub const ALL_REGIONS: &str = "Toutes les régions";

/// Value shown in front of the city list, selecting every city.
pub const ALL_CITIES: &str = "Toutes les villes";

/// Maps a selected list value to a filter value, the sentinel and blank
/// values select everything.
pub fn selection(value: Option<&str>, sentinel: &str) -> Option<String> {
    non_blank(value).filter(|value| value != sentinel)
}

/// Prefixes a list of distinct values with its sentinel.
pub fn with_sentinel(sentinel: &str, values: Vec<String>) -> Vec<String> {
    std::iter::once(sentinel.to_owned()).chain(values).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PharmacyFilter {
    /// Case-insensitive substring of name, neighborhood or city.
    pub search: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    /// Only permanently open pharmacies.
    pub duty_only: bool,
}

impl PharmacyFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: Option<&str>) -> Self {
        self.search = non_blank(term);
        self
    }

    pub fn region(mut self, region: Option<&str>) -> Self {
        self.region = selection(region, ALL_REGIONS);
        self
    }

    pub fn city(mut self, city: Option<&str>) -> Self {
        self.city = selection(city, ALL_CITIES);
        self
    }

    pub fn duty_only(mut self, duty_only: bool) -> Self {
        self.duty_only = duty_only;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.region.is_none() && self.city.is_none() && !self.duty_only
    }

    /// The text the search term is matched against.
    pub fn search_index(pharmacy: &Pharmacy) -> String {
        format!(
            "{} {} {}",
            pharmacy.name,
            pharmacy.neighborhood,
            pharmacy.city.as_deref().unwrap_or_default()
        )
        .to_lowercase()
    }

    pub fn matches(&self, pharmacy: &Pharmacy) -> bool {
        let search = self
            .search
            .as_deref()
            .map_or(true, |term| {
                contains_ignore_case(&Self::search_index(pharmacy), term)
            });
        let region = self
            .region
            .as_deref()
            .map_or(true, |region| pharmacy.region.trim() == region);
        let city = self
            .city
            .as_deref()
            .map_or(true, |city| pharmacy.city.as_deref().map(str::trim) == Some(city));
        let duty = !self.duty_only || pharmacy.is_24h;

        search && region && city && duty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExampleData;

    #[test]
    fn sentinels_select_everything() {
        let filter = PharmacyFilter::new()
            .region(Some(ALL_REGIONS))
            .city(Some(ALL_CITIES))
            .search(Some("  "));
        assert!(filter.is_empty());
    }

    #[test]
    fn with_sentinel_prefixes() {
        let values = with_sentinel(ALL_REGIONS, vec!["Littoral".to_owned()]);
        assert_eq!(values, vec![ALL_REGIONS.to_owned(), "Littoral".to_owned()]);
    }

    #[test]
    fn matching_combines_all_filters() {
        let pharmacy = Pharmacy::example_data();
        assert!(PharmacyFilter::new().search(Some("STEINMETZ")).matches(&pharmacy));
        assert!(PharmacyFilter::new().search(Some("cotonou")).matches(&pharmacy));
        assert!(!PharmacyFilter::new().search(Some("parakou")).matches(&pharmacy));
        assert!(PharmacyFilter::new()
            .region(Some("Littoral"))
            .city(Some("Cotonou"))
            .matches(&pharmacy));
        assert!(!PharmacyFilter::new().region(Some("Borgou")).matches(&pharmacy));
        assert!(!PharmacyFilter::new().duty_only(true).matches(&pharmacy));
    }

    #[test]
    fn stray_whitespace_in_stored_values_still_matches() {
        let pharmacy = Pharmacy {
            region: " Littoral ".to_owned(),
            city: Some("Cotonou  ".to_owned()),
            ..Pharmacy::example_data()
        };
        assert!(PharmacyFilter::new()
            .region(Some("Littoral"))
            .city(Some("Cotonou"))
            .matches(&pharmacy));
    }
}
