use model::{
    filter::{selection, with_sentinel, PharmacyFilter, ALL_CITIES, ALL_REGIONS},
    pharmacy::{Pharmacy, PharmacyDraft},
    stats::PharmacyStats,
    WithId,
};
use utility::id::Id;

use crate::{
    database::{Database, DatabaseError, DatabaseTransaction, PharmacyRepo},
    RequestError, RequestResult,
};

pub const MAX_PAGE_SIZE: usize = 100;

/// Row offset of `page`, capped at what a postgres `OFFSET` accepts.
fn offset(page: usize, page_size: usize) -> u64 {
    (page as u64)
        .saturating_mul(page_size as u64)
        .min(i64::MAX as u64)
}

/// Logs a failed store operation and converts it for the caller.
fn failed(action: &str, why: DatabaseError) -> RequestError {
    match why {
        DatabaseError::NotFound => log::debug!("{}: not found", action),
        ref other => log::error!("{}: {}", action, other),
    }
    RequestError::from(why)
}

/// The only way into the pharmacy store. Holds no state of its own, every
/// call is a fresh round trip.
#[derive(Clone)]
pub struct Client<D: Database> {
    database: D,
}

impl<D: Database> Client<D> {
    pub fn new(database: D) -> Self {
        Self { database }
    }

    pub fn database(&self) -> &D {
        &self.database
    }

    /// At most `page_size` pharmacies matching `filter`, ordered by name. A
    /// page shorter than `page_size` is the last one.
    pub async fn list_pharmacies(
        &self,
        page: usize,
        page_size: usize,
        filter: &PharmacyFilter,
    ) -> RequestResult<Vec<WithId<Pharmacy>>> {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self.database
            .auto()
            .get_page(filter, offset(page, page_size), page_size as u64)
            .await
            .map_err(|why| failed("listing pharmacies", why))
    }

    pub async fn get_pharmacy(&self, id: &Id<Pharmacy>) -> RequestResult<WithId<Pharmacy>> {
        self.database
            .auto()
            .get(id)
            .await
            .map_err(|why| failed("fetching pharmacy", why))
    }

    /// Distinct regions, prefixed with the "all regions" sentinel.
    pub async fn list_regions(&self) -> RequestResult<Vec<String>> {
        self.database
            .auto()
            .regions()
            .await
            .map(|regions| with_sentinel(ALL_REGIONS, regions))
            .map_err(|why| failed("listing regions", why))
    }

    /// Distinct cities of `region` (all regions for `None` or the sentinel),
    /// prefixed with the "all cities" sentinel.
    pub async fn list_cities(&self, region: Option<&str>) -> RequestResult<Vec<String>> {
        let region = selection(region, ALL_REGIONS);
        self.database
            .auto()
            .cities(region.as_deref())
            .await
            .map(|cities| with_sentinel(ALL_CITIES, cities))
            .map_err(|why| failed("listing cities", why))
    }

    pub async fn create_pharmacy(&self, draft: PharmacyDraft) -> RequestResult<WithId<Pharmacy>> {
        let draft = draft.normalized();
        draft.validate()?;
        let created = self
            .database
            .auto()
            .insert(draft.into_pharmacy())
            .await
            .map_err(|why| failed("creating pharmacy", why))?;
        log::info!("created pharmacy {} ({})", created.content.name, created.id);
        Ok(created)
    }

    pub async fn update_pharmacy(
        &self,
        id: &Id<Pharmacy>,
        draft: PharmacyDraft,
    ) -> RequestResult<WithId<Pharmacy>> {
        let draft = draft.normalized();
        draft.validate()?;
        let updated = self
            .database
            .auto()
            .update(id, draft)
            .await
            .map_err(|why| failed("updating pharmacy", why))?;
        log::info!("updated pharmacy {} ({})", updated.content.name, updated.id);
        Ok(updated)
    }

    /// Removes a pharmacy for good.
    pub async fn delete_pharmacy(&self, id: &Id<Pharmacy>) -> RequestResult<WithId<Pharmacy>> {
        let deleted = self
            .database
            .auto()
            .delete(id)
            .await
            .map_err(|why| failed("deleting pharmacy", why))?;
        log::info!("deleted pharmacy {} ({})", deleted.content.name, deleted.id);
        Ok(deleted)
    }

    pub async fn list_all_pharmacies(&self) -> RequestResult<Vec<WithId<Pharmacy>>> {
        self.database
            .auto()
            .get_all()
            .await
            .map_err(|why| failed("listing all pharmacies", why))
    }

    pub async fn compute_stats(&self) -> RequestResult<PharmacyStats> {
        self.database
            .auto()
            .stats()
            .await
            .map_err(|why| failed("computing statistics", why))
    }

    /// Replaces the whole table in one transaction.
    pub async fn replace_all(&self, pharmacies: Vec<Pharmacy>) -> RequestResult<u64> {
        let mut tx = self
            .database
            .transaction()
            .await
            .map_err(|why| failed("starting transaction", why))?;

        let deleted = tx
            .delete_all()
            .await
            .map_err(|why| failed("clearing pharmacies", why))?;
        log::info!("removed {} pharmacies", deleted);

        let inserted = tx
            .insert_all(pharmacies)
            .await
            .map_err(|why| failed("inserting pharmacies", why))?;

        tx.commit()
            .await
            .map_err(|why| failed("committing pharmacies", why))?;
        log::info!("inserted {} pharmacies", inserted);

        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use model::ExampleData;

    use super::*;
    use crate::database::memory::MemoryDatabase;

    fn pharmacy(name: &str, region: &str, city: &str, is_24h: bool) -> Pharmacy {
        Pharmacy {
            name: name.to_owned(),
            neighborhood: format!("Quartier {}", name),
            region: region.to_owned(),
            city: Some(city.to_owned()),
            is_24h,
            ..Pharmacy::example_data()
        }
    }

    fn scenario() -> Client<MemoryDatabase> {
        Client::new(MemoryDatabase::with_pharmacies([
            pharmacy("Pharmacie A", "Littoral", "Cotonou", false),
            pharmacy("Pharmacie B", "Littoral", "Cotonou", true),
        ]))
    }

    fn many() -> Client<MemoryDatabase> {
        let regions = [
            ("Littoral", "Cotonou"),
            ("Ouémé", "Porto-Novo"),
            ("Ouémé", "Sèmè-Podji"),
            ("Borgou", "Parakou"),
        ];
        Client::new(MemoryDatabase::with_pharmacies((0..23).map(|i| {
            let (region, city) = regions[i % regions.len()];
            pharmacy(&format!("Pharmacie {:02}", i), region, city, i % 3 == 0)
        })))
    }

    fn draft(name: &str) -> PharmacyDraft {
        PharmacyDraft {
            name: name.to_owned(),
            neighborhood: "Akpakpa".to_owned(),
            city: "Cotonou".to_owned(),
            region: "Littoral".to_owned(),
            phone: "+229 21 33 00 00".to_owned(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn scenario_stats() {
        let stats = scenario().compute_stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.count_24h, 1);
        assert_eq!(stats.regions, 1);
    }

    #[tokio::test]
    async fn scenario_duty_only() {
        let client = scenario();
        let filter = PharmacyFilter::new().duty_only(true);
        let pharmacies = client.list_pharmacies(0, 6, &filter).await.unwrap();
        assert_eq!(pharmacies.len(), 1);
        assert_eq!(pharmacies[0].content.name, "Pharmacie B");
    }

    #[tokio::test]
    async fn pages_never_exceed_page_size_and_only_the_last_is_short() {
        let client = many();
        let filters = [
            PharmacyFilter::new(),
            PharmacyFilter::new().duty_only(true),
            PharmacyFilter::new().region(Some("Ouémé")),
            PharmacyFilter::new().region(Some("Ouémé")).city(Some("Porto-Novo")),
            PharmacyFilter::new().search(Some("pharmacie 1")),
            PharmacyFilter::new().search(Some("nowhere")),
        ];
        for filter in filters.iter() {
            for page_size in [1, 4, 6, 50] {
                let mut page = 0;
                let mut seen = 0;
                loop {
                    let rows = client.list_pharmacies(page, page_size, filter).await.unwrap();
                    assert!(rows.len() <= page_size);
                    seen += rows.len();
                    if rows.len() < page_size {
                        let next = client
                            .list_pharmacies(page + 1, page_size, filter)
                            .await
                            .unwrap();
                        assert!(next.is_empty());
                        break;
                    }
                    page += 1;
                }
                let all = client.list_all_pharmacies().await.unwrap();
                let expected = all.iter().filter(|row| filter.matches(&row.content)).count();
                assert_eq!(seen, expected);
            }
        }
    }

    #[tokio::test]
    async fn page_size_is_clamped() {
        let client = many();
        let rows = client.list_pharmacies(0, 0, &PharmacyFilter::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn pages_far_past_the_end_are_empty() {
        let client = many();
        let rows = client
            .list_pharmacies(usize::MAX, MAX_PAGE_SIZE, &PharmacyFilter::new())
            .await
            .unwrap();
        assert!(rows.is_empty());
        assert_eq!(offset(usize::MAX, MAX_PAGE_SIZE), i64::MAX as u64);
        assert_eq!(offset(3, 6), 18);
    }

    #[tokio::test]
    async fn regions_are_distinct_and_sorted_after_the_sentinel() {
        let regions = many().list_regions().await.unwrap();
        assert_eq!(regions[0], ALL_REGIONS);
        let rest = &regions[1..];
        let mut sorted = rest.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(rest, sorted.as_slice());
        assert_eq!(rest.len(), 3);
    }

    #[tokio::test]
    async fn cities_follow_the_region() {
        let client = many();
        let cities = client.list_cities(Some("Ouémé")).await.unwrap();
        assert_eq!(cities, vec![ALL_CITIES, "Porto-Novo", "Sèmè-Podji"]);
        let all = client.list_cities(Some(ALL_REGIONS)).await.unwrap();
        assert_eq!(all.len(), 5);
    }

    #[tokio::test]
    async fn created_pharmacies_show_up_ordered_by_name() {
        let client = scenario();
        let created = client.create_pharmacy(draft("Pharmacie AA")).await.unwrap();
        let names = client
            .list_all_pharmacies()
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.content.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Pharmacie A", "Pharmacie AA", "Pharmacie B"]);
        assert_eq!(created.content.city.as_deref(), Some("Cotonou"));
    }

    #[tokio::test]
    async fn incomplete_drafts_are_rejected() {
        let client = scenario();
        let mut incomplete = draft("Pharmacie C");
        incomplete.phone = String::new();
        assert!(matches!(
            client.create_pharmacy(incomplete).await,
            Err(RequestError::Invalid(_))
        ));
        assert_eq!(client.compute_stats().await.unwrap().total, 2);
    }

    #[tokio::test]
    async fn deleted_pharmacies_disappear_from_listings() {
        let client = scenario();
        let all = client.list_all_pharmacies().await.unwrap();
        let id = all[0].id.clone();
        client.delete_pharmacy(&id).await.unwrap();

        let listed = client
            .list_pharmacies(0, 6, &PharmacyFilter::new())
            .await
            .unwrap();
        assert!(listed.iter().all(|row| row.id != id));
        assert!(matches!(
            client.delete_pharmacy(&id).await,
            Err(RequestError::NotFound)
        ));
    }

    #[tokio::test]
    async fn updates_keep_the_identifier() {
        let client = scenario();
        let id = client.list_all_pharmacies().await.unwrap()[0].id.clone();
        let updated = client
            .update_pharmacy(&id, draft("Pharmacie Z"))
            .await
            .unwrap();
        assert_eq!(updated.id, id);
        assert_eq!(client.get_pharmacy(&id).await.unwrap().content.name, "Pharmacie Z");
    }

    #[tokio::test]
    async fn replace_all_swaps_the_table() {
        let client = scenario();
        let inserted = client
            .replace_all(vec![pharmacy("Pharmacie Seule", "Borgou", "Parakou", true)])
            .await
            .unwrap();
        assert_eq!(inserted, 1);
        let all = client.list_all_pharmacies().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].content.region, "Borgou");
    }

    #[tokio::test]
    async fn store_failures_are_reported() {
        let client = scenario();
        client.database().set_unavailable(true);
        assert!(matches!(
            client.list_regions().await,
            Err(RequestError::Other(_))
        ));
    }
}
