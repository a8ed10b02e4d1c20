//! Products domain module (event-sourced).
//!
//! Catalog rules for products and their quantity pricing tiers, implemented as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod product;

pub use product::{
    ActivateProduct, AddPricingTier, ArchiveProduct, BasePriceChanged, ChangeBasePrice,
    CreateProduct, DeactivatePricingTier, PricingMetadata, PricingTierAdded,
    PricingTierDeactivated, PricingTierReactivated, PricingTierRemoved, Product, ProductActivated,
    ProductArchived, ProductCommand, ProductCreated, ProductEvent, ProductId, ProductStatus,
    ReactivatePricingTier, RemovePricingTier, ReplacePricingTier,
};
