use model::{
    pharmacy::{Pharmacy, PharmacyDraft},
    stats::PharmacyStats,
    WithId,
};
use utility::{
    id::Id,
    text::{contains_ignore_case, non_blank},
};

use crate::{client::Client, database::Database, RequestError, RequestResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(Id<Pharmacy>),
}

/// First half of a deletion. Only `AdminDashboard::confirm_delete` turns it
/// into an actual removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionRequest {
    pub id: Id<Pharmacy>,
    pub name: String,
}

pub struct AdminDashboard<D: Database> {
    client: Client<D>,
    pharmacies: Vec<WithId<Pharmacy>>,
    stats: PharmacyStats,
    search: Option<String>,
    form: Option<FormMode>,
}

impl<D: Database> AdminDashboard<D> {
    pub fn new(client: Client<D>) -> Self {
        Self {
            client,
            pharmacies: Vec::new(),
            stats: PharmacyStats::default(),
            search: None,
            form: None,
        }
    }

    pub fn pharmacies(&self) -> &[WithId<Pharmacy>] {
        &self.pharmacies
    }

    pub fn stats(&self) -> &PharmacyStats {
        &self.stats
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn form(&self) -> Option<&FormMode> {
        self.form.as_ref()
    }

    /// Fetches the full list and the statistics at the same time.
    pub async fn load(&mut self) -> RequestResult<()> {
        let (pharmacies, stats) = futures::try_join!(
            self.client.list_all_pharmacies(),
            self.client.compute_stats()
        )?;
        self.pharmacies = pharmacies;
        self.stats = stats;
        Ok(())
    }

    pub fn set_search(&mut self, term: Option<&str>) {
        self.search = non_blank(term);
    }

    /// Loaded pharmacies whose name, city or region contain the search term.
    pub fn filtered(&self) -> Vec<&WithId<Pharmacy>> {
        let Some(term) = self.search.as_deref() else {
            return self.pharmacies.iter().collect();
        };
        self.pharmacies
            .iter()
            .filter(|pharmacy| {
                let content = &pharmacy.content;
                contains_ignore_case(&content.name, term)
                    || contains_ignore_case(&content.region, term)
                    || content
                        .city
                        .as_deref()
                        .map_or(false, |city| contains_ignore_case(city, term))
            })
            .collect()
    }

    pub fn open_create(&mut self) -> PharmacyDraft {
        self.form = Some(FormMode::Create);
        PharmacyDraft::default()
    }

    /// Opens the form for a loaded pharmacy, prefilled with its values.
    pub fn open_edit(&mut self, id: &Id<Pharmacy>) -> RequestResult<PharmacyDraft> {
        let pharmacy = self.find(id)?;
        let draft = PharmacyDraft::from_pharmacy(&pharmacy.content);
        self.form = Some(FormMode::Edit(id.clone()));
        Ok(draft)
    }

    pub fn close_form(&mut self) {
        self.form = None;
    }

    /// Creates or updates depending on the open form, a submit without an
    /// open form creates. Closes the form once the store accepted the record,
    /// keeps it open otherwise. A failed reload afterwards does not undo the
    /// save, the saved record is merged into the loaded list instead.
    pub async fn submit(&mut self, draft: PharmacyDraft) -> RequestResult<WithId<Pharmacy>> {
        let saved = match self.form.clone().unwrap_or(FormMode::Create) {
            FormMode::Create => self.client.create_pharmacy(draft).await?,
            FormMode::Edit(id) => self.client.update_pharmacy(&id, draft).await?,
        };
        self.form = None;
        if let Err(why) = self.load().await {
            log::warn!("could not reload the dashboard: {}", why);
            match self.pharmacies.iter_mut().find(|row| row.id == saved.id) {
                Some(row) => *row = saved.clone(),
                None => self.pharmacies.push(saved.clone()),
            }
            self.stats = PharmacyStats::compute(self.pharmacies.iter().map(|row| &row.content));
        }
        Ok(saved)
    }

    pub fn request_delete(&self, id: &Id<Pharmacy>) -> RequestResult<DeletionRequest> {
        let pharmacy = self.find(id)?;
        Ok(DeletionRequest {
            id: pharmacy.id.clone(),
            name: pharmacy.content.name.clone(),
        })
    }

    /// Deletes in the store and, once that succeeded, from the dashboard.
    pub async fn confirm_delete(
        &mut self,
        request: DeletionRequest,
    ) -> RequestResult<WithId<Pharmacy>> {
        let deleted = self.client.delete_pharmacy(&request.id).await?;
        self.pharmacies.retain(|pharmacy| pharmacy.id != request.id);
        self.stats = match self.client.compute_stats().await {
            Ok(stats) => stats,
            Err(why) => {
                log::warn!("could not refresh statistics: {}", why);
                PharmacyStats::compute(self.pharmacies.iter().map(|row| &row.content))
            }
        };
        Ok(deleted)
    }

    fn find(&self, id: &Id<Pharmacy>) -> RequestResult<&WithId<Pharmacy>> {
        self.pharmacies
            .iter()
            .find(|pharmacy| &pharmacy.id == id)
            .ok_or(RequestError::NotFound)
    }
}
