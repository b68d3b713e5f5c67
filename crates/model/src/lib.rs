use schemars::JsonSchema;
use std::fmt::Debug;

use serde::Serialize;
pub use serde_with;
use utility::id::{HasId, Id};

pub mod detail;
pub mod filter;
pub mod pharmacy;
pub mod stats;

pub trait ExampleData {
    fn example_data() -> Self;
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct WithId<V>
where
    V: HasId,
    V::IdType: Serialize + Debug + Clone + PartialEq,
{
    pub id: Id<V>,
    #[serde(flatten)]
    pub content: V,
}

impl<V> WithId<V>
where
    V: HasId,
    V::IdType: Serialize + Debug + Clone + PartialEq,
{
    pub fn new(id: Id<V>, content: V) -> Self {
        Self { id, content }
    }
}
