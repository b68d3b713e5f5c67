use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::pharmacy::Pharmacy;

/// Aggregates shown on the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PharmacyStats {
    pub total: u64,
    pub count_24h: u64,
    /// Distinct non-empty regions.
    pub regions: u64,
    /// Distinct non-empty cities.
    pub cities: u64,
}

impl PharmacyStats {
    pub fn compute<'a, I>(pharmacies: I) -> Self
    where
        I: IntoIterator<Item = &'a Pharmacy>,
    {
        let mut stats = Self::default();
        let mut regions = HashSet::new();
        let mut cities = HashSet::new();
        for pharmacy in pharmacies {
            stats.total += 1;
            if pharmacy.is_24h {
                stats.count_24h += 1;
            }
            if !pharmacy.region.trim().is_empty() {
                regions.insert(pharmacy.region.as_str());
            }
            if let Some(city) = pharmacy.city.as_deref().filter(|c| !c.trim().is_empty()) {
                cities.insert(city);
            }
        }
        stats.regions = regions.len() as u64;
        stats.cities = cities.len() as u64;
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExampleData;

    #[test]
    fn counts_distinct_regions_and_cities() {
        let a = Pharmacy {
            name: "Pharmacie A".to_owned(),
            is_24h: false,
            ..Pharmacy::example_data()
        };
        let b = Pharmacy {
            name: "Pharmacie B".to_owned(),
            is_24h: true,
            city: None,
            ..Pharmacy::example_data()
        };
        let stats = PharmacyStats::compute([&a, &b]);
        assert_eq!(
            stats,
            PharmacyStats {
                total: 2,
                count_24h: 1,
                regions: 1,
                cities: 1,
            }
        );
    }

    #[test]
    fn serializes_like_the_dashboard_expects() {
        let json = serde_json::to_value(PharmacyStats::default()).unwrap();
        assert!(json.get("count24h").is_some());
    }
}
