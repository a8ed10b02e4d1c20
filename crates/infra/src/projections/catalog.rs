use std::collections::HashMap;
use std::sync::RwLock;

use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use storefront_core::AggregateId;
use storefront_events::EventEnvelope;
use storefront_pricing::PricingTierSet;
use storefront_products::{PricingMetadata, ProductEvent, ProductId, ProductStatus};

use crate::aggregate_types::PRODUCT;
use crate::read_model::ReadStore;

/// Catalog listing row: a product with its pricing and every tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub status: ProductStatus,
    pub pricing: PricingMetadata,
    pub tiers: PricingTierSet,
}

impl CatalogEntry {
    fn placeholder(product_id: ProductId) -> Self {
        Self {
            product_id,
            sku: String::new(),
            name: String::new(),
            status: ProductStatus::Draft,
            pricing: PricingMetadata::default(),
            tiers: PricingTierSet::new(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogProjectionError {
    #[error("failed to deserialize product event: {0}")]
    Deserialize(String),

    #[error("event product_id does not match envelope aggregate_id")]
    AggregateMismatch,

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },

    #[error("catalog cursor lock poisoned")]
    Poisoned,
}

/// Product catalog read model, fed from the event bus.
#[derive(Debug)]
pub struct ProductCatalogProjection<S>
where
    S: ReadStore<ProductId, CatalogEntry>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> ProductCatalogProjection<S>
where
    S: ReadStore<ProductId, CatalogEntry>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, product_id: &ProductId) -> Option<CatalogEntry> {
        self.store.get(product_id)
    }

    /// All entries, ordered by SKU.
    pub fn list(&self) -> Vec<CatalogEntry> {
        let mut entries = self.store.list();
        entries.sort_by(|a, b| a.sku.cmp(&b.sku));
        entries
    }

    fn cursor(&self, aggregate_id: AggregateId) -> Result<u64, CatalogProjectionError> {
        let cursors = self
            .cursors
            .read()
            .map_err(|_| CatalogProjectionError::Poisoned)?;
        Ok(cursors.get(&aggregate_id).copied().unwrap_or(0))
    }

    fn advance(&self, aggregate_id: AggregateId, sequence_number: u64) -> Result<(), CatalogProjectionError> {
        self.cursors
            .write()
            .map_err(|_| CatalogProjectionError::Poisoned)?
            .insert(aggregate_id, sequence_number);
        Ok(())
    }

    /// Apply one published event. Envelopes for other aggregate types are
    /// ignored, as are redeliveries of events already applied.
    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), CatalogProjectionError> {
        if !envelope.is_for(PRODUCT) {
            return Ok(());
        }

        let position = envelope.position();
        let aggregate_id = position.aggregate_id;
        let seq = position.sequence_number;
        let last = self.cursor(aggregate_id)?;
        if seq <= last {
            return Ok(());
        }
        if !position.follows(last) {
            return Err(CatalogProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let ev: ProductEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| CatalogProjectionError::Deserialize(e.to_string()))?;

        let product_id = ev.product_id();
        if product_id.0 != aggregate_id {
            return Err(CatalogProjectionError::AggregateMismatch);
        }

        let mut entry = self
            .store
            .get(&product_id)
            .unwrap_or_else(|| CatalogEntry::placeholder(product_id));

        match ev {
            ProductEvent::ProductCreated(e) => {
                entry = CatalogEntry {
                    product_id,
                    sku: e.sku,
                    name: e.name,
                    status: ProductStatus::Draft,
                    pricing: e.pricing,
                    tiers: PricingTierSet::new(),
                };
            }
            ProductEvent::ProductActivated(_) => entry.status = ProductStatus::Active,
            ProductEvent::ProductArchived(_) => entry.status = ProductStatus::Archived,
            ProductEvent::BasePriceChanged(e) => entry.pricing.base_price = Some(e.base_price),
            ProductEvent::PricingTierAdded(e) => entry.tiers.insert(e.tier),
            ProductEvent::PricingTierRemoved(e) => {
                entry.tiers.remove(e.tier_id);
            }
            ProductEvent::PricingTierDeactivated(e) => {
                entry.tiers.set_active(e.tier_id, false);
            }
            ProductEvent::PricingTierReactivated(e) => {
                entry.tiers.set_active(e.tier_id, true);
            }
        }

        self.store.upsert(product_id, entry);
        self.advance(aggregate_id, seq)
    }

    /// Drop everything and replay `envelopes` (any order; sorted per stream).
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), CatalogProjectionError> {
        self.cursors
            .write()
            .map_err(|_| CatalogProjectionError::Poisoned)?
            .clear();
        self.store.clear();

        let mut envs: Vec<_> = envelopes.into_iter().collect();
        envs.sort_by_key(|e| e.position());

        for env in &envs {
            self.apply_envelope(env)?;
        }
        Ok(())
    }
}
