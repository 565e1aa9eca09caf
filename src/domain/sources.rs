//! Collaborators the engine consumes: the item catalog and the price source.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use super::entities::{ItemId, PriceQuote};
use super::item::ItemMetadata;

/// Read-only lookup of static item metadata.
pub trait ItemCatalog: Send + Sync {
    fn lookup(&self, item_id: &str) -> Option<ItemMetadata>;
}

impl ItemCatalog for HashMap<ItemId, ItemMetadata> {
    fn lookup(&self, item_id: &str) -> Option<ItemMetadata> {
        self.get(item_id).cloned()
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PriceSourceError {
    #[error("price source rejected the request rate")]
    RateLimited,
    #[error("price source failed: {0}")]
    Transient(String),
}

/// Delivers the latest batch of quotes for an item, one per observed
/// location/quality pair. Implementations do their own retrying, if any.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_quotes(&self, item_id: &str) -> Result<Vec<PriceQuote>, PriceSourceError>;
}
