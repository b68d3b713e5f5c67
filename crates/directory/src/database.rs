use std::{error, fmt, result};

use async_trait::async_trait;
use model::{
    filter::PharmacyFilter,
    pharmacy::{Pharmacy, PharmacyDraft},
    stats::PharmacyStats,
    WithId,
};
use utility::id::Id;

pub mod memory;

#[derive(Debug)]
pub enum DatabaseError {
    NotFound,
    Other(Box<dyn error::Error + Send + Sync>),
}

impl DatabaseError {
    pub fn other<E: Into<Box<dyn error::Error + Send + Sync>>>(why: E) -> Self {
        Self::Other(why.into())
    }
}

impl error::Error for DatabaseError {}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "row not found"),
            Self::Other(why) => write!(f, "database error: {}", why),
        }
    }
}

pub type Result<T> = result::Result<T, DatabaseError>;

#[async_trait]
pub trait PharmacyRepo {
    async fn get(&mut self, id: &Id<Pharmacy>) -> Result<WithId<Pharmacy>>;

    /// Rows matching `filter`, ordered by name, then id.
    async fn get_page(
        &mut self,
        filter: &PharmacyFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<WithId<Pharmacy>>>;

    /// All rows, ordered by name, then id.
    async fn get_all(&mut self) -> Result<Vec<WithId<Pharmacy>>>;

    /// Distinct, sorted, non-empty regions.
    async fn regions(&mut self) -> Result<Vec<String>>;

    /// Distinct, sorted, non-empty cities, optionally of one region only.
    async fn cities(&mut self, region: Option<&str>) -> Result<Vec<String>>;

    async fn insert(&mut self, pharmacy: Pharmacy) -> Result<WithId<Pharmacy>>;

    async fn insert_all(&mut self, pharmacies: Vec<Pharmacy>) -> Result<u64>;

    /// Overwrites the columns a draft carries, leaves all others untouched.
    async fn update(
        &mut self,
        id: &Id<Pharmacy>,
        draft: PharmacyDraft,
    ) -> Result<WithId<Pharmacy>>;

    async fn delete(&mut self, id: &Id<Pharmacy>) -> Result<WithId<Pharmacy>>;

    async fn delete_all(&mut self) -> Result<u64>;

    async fn stats(&mut self) -> Result<PharmacyStats>;
}

#[async_trait]
pub trait DatabaseTransaction {
    async fn commit(self) -> Result<()>;
}

#[async_trait]
pub trait Database: Clone + Send + Sync + 'static {
    type Transaction: DatabaseTransaction + PharmacyRepo + Send;
    type Autocommit: PharmacyRepo + Send;

    /// Every operation on the returned handle is its own round trip.
    fn auto(&self) -> Self::Autocommit;

    async fn transaction(&self) -> Result<Self::Transaction>;
}
