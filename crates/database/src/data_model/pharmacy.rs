use async_trait::async_trait;
use chrono::NaiveDate;
use directory::database::{PharmacyRepo, Result};
use model::{
    filter::PharmacyFilter,
    pharmacy::{Pharmacy, PharmacyDraft},
    stats::PharmacyStats,
    WithId,
};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::queries::pharmacy::{
    cities, delete, delete_all, get, get_all, get_page, insert, insert_all, regions, stats,
    update,
};
use crate::{queries::convert_error, PgDatabaseAutocommit, PgDatabaseTransaction};

use super::DatabaseRow;

#[derive(Debug, Clone, FromRow)]
pub struct PharmacyRow {
    pub id: String,
    pub name: String,
    pub neighborhood: String,
    pub city: Option<String>,
    pub region: String,
    pub phone: String,
    pub is_24h: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub group_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub hours: Option<String>,
    pub services: Vec<String>,
}

impl DatabaseRow for PharmacyRow {
    type Model = Pharmacy;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id.clone())
    }

    fn to_model(self) -> Self::Model {
        Pharmacy {
            name: self.name,
            neighborhood: self.neighborhood,
            city: self.city,
            region: self.region,
            phone: self.phone,
            is_24h: self.is_24h,
            start_date: self.start_date,
            end_date: self.end_date,
            group_name: self.group_name,
            latitude: self.latitude,
            longitude: self.longitude,
            hours: self.hours,
            services: self.services,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StatsRow {
    pub total: i64,
    pub count_24h: i64,
    pub regions: i64,
    pub cities: i64,
}

impl From<StatsRow> for PharmacyStats {
    fn from(row: StatsRow) -> Self {
        Self {
            total: row.total.max(0) as u64,
            count_24h: row.count_24h.max(0) as u64,
            regions: row.regions.max(0) as u64,
            cities: row.cities.max(0) as u64,
        }
    }
}

#[async_trait]
impl PharmacyRepo for PgDatabaseAutocommit {
    async fn get(&mut self, id: &Id<Pharmacy>) -> Result<WithId<Pharmacy>> {
        get(&self.pool, id).await
    }

    async fn get_page(
        &mut self,
        filter: &PharmacyFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<WithId<Pharmacy>>> {
        get_page(&self.pool, filter, offset, limit).await
    }

    async fn get_all(&mut self) -> Result<Vec<WithId<Pharmacy>>> {
        get_all(&self.pool).await
    }

    async fn regions(&mut self) -> Result<Vec<String>> {
        regions(&self.pool).await
    }

    async fn cities(&mut self, region: Option<&str>) -> Result<Vec<String>> {
        cities(&self.pool, region).await
    }

    async fn insert(&mut self, pharmacy: Pharmacy) -> Result<WithId<Pharmacy>> {
        insert(&self.pool, pharmacy).await
    }

    async fn insert_all(&mut self, pharmacies: Vec<Pharmacy>) -> Result<u64> {
        let mut connection = self.pool.acquire().await.map_err(convert_error)?;
        insert_all(&mut *connection, &pharmacies).await
    }

    async fn update(
        &mut self,
        id: &Id<Pharmacy>,
        draft: PharmacyDraft,
    ) -> Result<WithId<Pharmacy>> {
        update(&self.pool, id, draft).await
    }

    async fn delete(&mut self, id: &Id<Pharmacy>) -> Result<WithId<Pharmacy>> {
        delete(&self.pool, id).await
    }

    async fn delete_all(&mut self) -> Result<u64> {
        delete_all(&self.pool).await
    }

    async fn stats(&mut self) -> Result<PharmacyStats> {
        stats(&self.pool).await
    }
}

#[async_trait]
impl<'a> PharmacyRepo for PgDatabaseTransaction<'a> {
    async fn get(&mut self, id: &Id<Pharmacy>) -> Result<WithId<Pharmacy>> {
        get(&mut *self.tx, id).await
    }

    async fn get_page(
        &mut self,
        filter: &PharmacyFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<WithId<Pharmacy>>> {
        get_page(&mut *self.tx, filter, offset, limit).await
    }

    async fn get_all(&mut self) -> Result<Vec<WithId<Pharmacy>>> {
        get_all(&mut *self.tx).await
    }

    async fn regions(&mut self) -> Result<Vec<String>> {
        regions(&mut *self.tx).await
    }

    async fn cities(&mut self, region: Option<&str>) -> Result<Vec<String>> {
        cities(&mut *self.tx, region).await
    }

    async fn insert(&mut self, pharmacy: Pharmacy) -> Result<WithId<Pharmacy>> {
        insert(&mut *self.tx, pharmacy).await
    }

    async fn insert_all(&mut self, pharmacies: Vec<Pharmacy>) -> Result<u64> {
        insert_all(&mut *self.tx, &pharmacies).await
    }

    async fn update(
        &mut self,
        id: &Id<Pharmacy>,
        draft: PharmacyDraft,
    ) -> Result<WithId<Pharmacy>> {
        update(&mut *self.tx, id, draft).await
    }

    async fn delete(&mut self, id: &Id<Pharmacy>) -> Result<WithId<Pharmacy>> {
        delete(&mut *self.tx, id).await
    }

    async fn delete_all(&mut self) -> Result<u64> {
        delete_all(&mut *self.tx).await
    }

    async fn stats(&mut self) -> Result<PharmacyStats> {
        stats(&mut *self.tx).await
    }
}

#[cfg(test)]
mod tests {
    use directory::database::Database;

    use super::*;
    use crate::PgDatabase;

    fn repository<R: PharmacyRepo + Send>() {}

    fn database<D: Database>() {}

    #[test]
    fn autocommit_and_transactions_are_repositories() {
        repository::<PgDatabaseAutocommit>();
        repository::<PgDatabaseTransaction<'static>>();
        database::<PgDatabase>();
    }
}
