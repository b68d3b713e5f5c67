use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use itertools::Itertools;
use model::{
    filter::PharmacyFilter,
    pharmacy::{Pharmacy, PharmacyDraft},
    stats::PharmacyStats,
    WithId,
};
use utility::id::Id;

use super::{Database, DatabaseError, DatabaseTransaction, PharmacyRepo, Result};

#[derive(Debug, Clone, Default)]
struct MemoryStore {
    rows: Vec<WithId<Pharmacy>>,
    next_id: u64,
}

impl MemoryStore {
    fn sorted(&self) -> Vec<WithId<Pharmacy>> {
        self.rows
            .iter()
            .cloned()
            .sorted_by(|a, b| {
                a.content
                    .name
                    .cmp(&b.content.name)
                    .then_with(|| a.id.raw_ref::<str>().cmp(b.id.raw_ref::<str>()))
            })
            .collect()
    }

    fn position(&self, id: &Id<Pharmacy>) -> Result<usize> {
        self.rows
            .iter()
            .position(|row| &row.id == id)
            .ok_or(DatabaseError::NotFound)
    }

    fn get(&mut self, id: &Id<Pharmacy>) -> Result<WithId<Pharmacy>> {
        let position = self.position(id)?;
        Ok(self.rows[position].clone())
    }

    fn get_page(
        &mut self,
        filter: &PharmacyFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<WithId<Pharmacy>>> {
        Ok(self
            .sorted()
            .into_iter()
            .filter(|row| filter.matches(&row.content))
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    fn get_all(&mut self) -> Result<Vec<WithId<Pharmacy>>> {
        Ok(self.sorted())
    }

    fn regions(&mut self) -> Result<Vec<String>> {
        Ok(self
            .rows
            .iter()
            .map(|row| row.content.region.trim())
            .filter(|region| !region.is_empty())
            .sorted()
            .dedup()
            .map(str::to_owned)
            .collect())
    }

    fn cities(&mut self, region: Option<&str>) -> Result<Vec<String>> {
        Ok(self
            .rows
            .iter()
            .filter(|row| region.map_or(true, |region| row.content.region.trim() == region))
            .filter_map(|row| row.content.city.as_deref())
            .map(str::trim)
            .filter(|city| !city.is_empty())
            .sorted()
            .dedup()
            .map(str::to_owned)
            .collect())
    }

    fn insert(&mut self, pharmacy: Pharmacy) -> Result<WithId<Pharmacy>> {
        self.next_id += 1;
        let row = WithId::new(Id::new(format!("mem-{:06}", self.next_id)), pharmacy);
        self.rows.push(row.clone());
        Ok(row)
    }

    fn insert_all(&mut self, pharmacies: Vec<Pharmacy>) -> Result<u64> {
        let count = pharmacies.len() as u64;
        for pharmacy in pharmacies {
            self.insert(pharmacy)?;
        }
        Ok(count)
    }

    fn update(&mut self, id: &Id<Pharmacy>, draft: PharmacyDraft) -> Result<WithId<Pharmacy>> {
        let position = self.position(id)?;
        draft.apply_to(&mut self.rows[position].content);
        Ok(self.rows[position].clone())
    }

    fn delete(&mut self, id: &Id<Pharmacy>) -> Result<WithId<Pharmacy>> {
        let position = self.position(id)?;
        Ok(self.rows.remove(position))
    }

    fn delete_all(&mut self) -> Result<u64> {
        let count = self.rows.len() as u64;
        self.rows.clear();
        Ok(count)
    }

    fn stats(&mut self) -> Result<PharmacyStats> {
        Ok(PharmacyStats::compute(self.rows.iter().map(|row| &row.content)))
    }
}

/// A process local store with the same ordering and filter semantics as the
/// postgres implementation. Used for tests and local experiments.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    store: Arc<Mutex<MemoryStore>>,
    unavailable: Arc<AtomicBool>,
    remaining: Arc<Mutex<Option<usize>>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pharmacies<I: IntoIterator<Item = Pharmacy>>(pharmacies: I) -> Self {
        let database = Self::new();
        if let Ok(mut store) = database.store.lock() {
            for pharmacy in pharmacies {
                let _ = store.insert(pharmacy);
            }
        }
        database
    }

    /// While unavailable, every operation fails like a lost connection would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Lets `operations` more operations through, then behaves like
    /// `set_unavailable(true)`.
    pub fn fail_after(&self, operations: usize) {
        if let Ok(mut remaining) = self.remaining.lock() {
            *remaining = Some(operations);
        }
    }

    pub fn len(&self) -> usize {
        self.store.lock().map(|store| store.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<()> {
        if let Ok(mut remaining) = self.remaining.lock() {
            match *remaining {
                Some(0) => {
                    *remaining = None;
                    self.set_unavailable(true);
                }
                Some(left) => *remaining = Some(left - 1),
                None => {}
            }
        }
        if self.unavailable.load(Ordering::SeqCst) {
            Err(DatabaseError::other("memory database is unavailable"))
        } else {
            Ok(())
        }
    }

    fn with_store<R>(&self, action: impl FnOnce(&mut MemoryStore) -> Result<R>) -> Result<R> {
        self.check_available()?;
        let mut store = self
            .store
            .lock()
            .map_err(|_| DatabaseError::other("memory store lock poisoned"))?;
        action(&mut store)
    }
}

pub struct MemoryAutocommit {
    database: MemoryDatabase,
}

impl MemoryAutocommit {
    fn with_store<R>(&mut self, action: impl FnOnce(&mut MemoryStore) -> Result<R>) -> Result<R> {
        self.database.with_store(action)
    }
}

/// Works on a snapshot which replaces the shared rows on commit.
pub struct MemoryTransaction {
    database: MemoryDatabase,
    working: MemoryStore,
}

impl MemoryTransaction {
    fn with_store<R>(&mut self, action: impl FnOnce(&mut MemoryStore) -> Result<R>) -> Result<R> {
        self.database.check_available()?;
        action(&mut self.working)
    }
}

#[async_trait]
impl DatabaseTransaction for MemoryTransaction {
    async fn commit(self) -> Result<()> {
        let working = self.working;
        self.database.with_store(move |store| {
            *store = working;
            Ok(())
        })
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    type Transaction = MemoryTransaction;
    type Autocommit = MemoryAutocommit;

    fn auto(&self) -> Self::Autocommit {
        MemoryAutocommit {
            database: self.clone(),
        }
    }

    async fn transaction(&self) -> Result<Self::Transaction> {
        let working = self.with_store(|store| Ok(store.clone()))?;
        Ok(MemoryTransaction {
            database: self.clone(),
            working,
        })
    }
}

macro_rules! memory_repo {
    ($handle:ty) => {
        #[async_trait]
        impl PharmacyRepo for $handle {
            async fn get(&mut self, id: &Id<Pharmacy>) -> Result<WithId<Pharmacy>> {
                self.with_store(|store| store.get(id))
            }

            async fn get_page(
                &mut self,
                filter: &PharmacyFilter,
                offset: u64,
                limit: u64,
            ) -> Result<Vec<WithId<Pharmacy>>> {
                self.with_store(|store| store.get_page(filter, offset, limit))
            }

            async fn get_all(&mut self) -> Result<Vec<WithId<Pharmacy>>> {
                self.with_store(|store| store.get_all())
            }

            async fn regions(&mut self) -> Result<Vec<String>> {
                self.with_store(|store| store.regions())
            }

            async fn cities(&mut self, region: Option<&str>) -> Result<Vec<String>> {
                self.with_store(|store| store.cities(region))
            }

            async fn insert(&mut self, pharmacy: Pharmacy) -> Result<WithId<Pharmacy>> {
                self.with_store(move |store| store.insert(pharmacy))
            }

            async fn insert_all(&mut self, pharmacies: Vec<Pharmacy>) -> Result<u64> {
                self.with_store(move |store| store.insert_all(pharmacies))
            }

            async fn update(
                &mut self,
                id: &Id<Pharmacy>,
                draft: PharmacyDraft,
            ) -> Result<WithId<Pharmacy>> {
                self.with_store(move |store| store.update(id, draft))
            }

            async fn delete(&mut self, id: &Id<Pharmacy>) -> Result<WithId<Pharmacy>> {
                self.with_store(|store| store.delete(id))
            }

            async fn delete_all(&mut self) -> Result<u64> {
                self.with_store(|store| store.delete_all())
            }

            async fn stats(&mut self) -> Result<PharmacyStats> {
                self.with_store(|store| store.stats())
            }
        }
    };
}

memory_repo!(MemoryAutocommit);
memory_repo!(MemoryTransaction);
