use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{
    Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult, Money, Quantity, TierId,
};
use storefront_events::{Command, Event};
use storefront_pricing::{
    PriceQuote, PricingTier, PricingTierSet, TierCandidate, quote, validate, validate_against,
};

/// Product identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Draft until activated; archived products are kept for history only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Draft,
    Active,
    Archived,
}

/// Base pricing of a product. Tiers override `base_price` for the quantities
/// they cover.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingMetadata {
    pub base_price: Option<Money>,
    /// ISO currency code (e.g. "USD"); informational only.
    pub currency: Option<String>,
}

/// A sellable item, rebuilt from its `products.product` stream.
///
/// Owns the product's pricing tiers. Every tier enters through
/// [`storefront_pricing::validate`], so the active tiers never overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    sku: String,
    name: String,
    status: ProductStatus,
    pricing: PricingMetadata,
    tiers: PricingTierSet,
    version: u64,
    created: bool,
}

impl Product {
    /// Blank instance to replay a stream into.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            sku: String::new(),
            name: String::new(),
            status: ProductStatus::Draft,
            pricing: PricingMetadata::default(),
            tiers: PricingTierSet::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    pub fn pricing(&self) -> &PricingMetadata {
        &self.pricing
    }

    pub fn tiers(&self) -> &PricingTierSet {
        &self.tiers
    }

    pub fn can_be_sold(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Price `quantity` units: the matching active tier, else the base price.
    pub fn unit_price_for(&self, quantity: Quantity) -> DomainResult<PriceQuote> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        let base_price = self.pricing.base_price.ok_or_else(|| {
            DomainError::validation(format!("product {} has no base price", self.sku))
        })?;
        quote(&self.tiers, base_price, quantity)
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub pricing: Option<PricingMetadata>,
    pub occurred_at: DateTime<Utc>,
}

/// Requires a base price: an active product must be priceable at every
/// quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateProduct {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveProduct {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBasePrice {
    pub product_id: ProductId,
    pub base_price: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Admit a new band, validated against the active tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddPricingTier {
    pub product_id: ProductId,
    pub tier_id: TierId,
    pub candidate: TierCandidate,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovePricingTier {
    pub product_id: ProductId,
    pub tier_id: TierId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivatePricingTier {
    pub product_id: ProductId,
    pub tier_id: TierId,
    pub occurred_at: DateTime<Utc>,
}

/// Put an inactive band back; it is validated again like a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactivatePricingTier {
    pub product_id: ProductId,
    pub tier_id: TierId,
    pub occurred_at: DateTime<Utc>,
}

/// An edit: removes `tier_id` and admits `candidate` as `new_tier_id` in one
/// step. The candidate is checked against the other active tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacePricingTier {
    pub product_id: ProductId,
    pub tier_id: TierId,
    pub new_tier_id: TierId,
    pub candidate: TierCandidate,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    ActivateProduct(ActivateProduct),
    ArchiveProduct(ArchiveProduct),
    ChangeBasePrice(ChangeBasePrice),
    AddPricingTier(AddPricingTier),
    RemovePricingTier(RemovePricingTier),
    DeactivatePricingTier(DeactivatePricingTier),
    ReactivatePricingTier(ReactivatePricingTier),
    ReplacePricingTier(ReplacePricingTier),
}

impl ProductCommand {
    pub fn product_id(&self) -> ProductId {
        match self {
            ProductCommand::CreateProduct(c) => c.product_id,
            ProductCommand::ActivateProduct(c) => c.product_id,
            ProductCommand::ArchiveProduct(c) => c.product_id,
            ProductCommand::ChangeBasePrice(c) => c.product_id,
            ProductCommand::AddPricingTier(c) => c.product_id,
            ProductCommand::RemovePricingTier(c) => c.product_id,
            ProductCommand::DeactivatePricingTier(c) => c.product_id,
            ProductCommand::ReactivatePricingTier(c) => c.product_id,
            ProductCommand::ReplacePricingTier(c) => c.product_id,
        }
    }
}

impl Command for ProductCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        self.product_id().0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub pricing: PricingMetadata,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductActivated {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductArchived {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasePriceChanged {
    pub product_id: ProductId,
    pub base_price: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Carries the admitted tier in full, so replay never re-validates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTierAdded {
    pub product_id: ProductId,
    pub tier: PricingTier,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTierRemoved {
    pub product_id: ProductId,
    pub tier_id: TierId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTierDeactivated {
    pub product_id: ProductId,
    pub tier_id: TierId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTierReactivated {
    pub product_id: ProductId,
    pub tier_id: TierId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    ProductActivated(ProductActivated),
    ProductArchived(ProductArchived),
    BasePriceChanged(BasePriceChanged),
    PricingTierAdded(PricingTierAdded),
    PricingTierRemoved(PricingTierRemoved),
    PricingTierDeactivated(PricingTierDeactivated),
    PricingTierReactivated(PricingTierReactivated),
}

impl ProductEvent {
    pub fn product_id(&self) -> ProductId {
        match self {
            ProductEvent::ProductCreated(e) => e.product_id,
            ProductEvent::ProductActivated(e) => e.product_id,
            ProductEvent::ProductArchived(e) => e.product_id,
            ProductEvent::BasePriceChanged(e) => e.product_id,
            ProductEvent::PricingTierAdded(e) => e.product_id,
            ProductEvent::PricingTierRemoved(e) => e.product_id,
            ProductEvent::PricingTierDeactivated(e) => e.product_id,
            ProductEvent::PricingTierReactivated(e) => e.product_id,
        }
    }
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "products.product.created",
            ProductEvent::ProductActivated(_) => "products.product.activated",
            ProductEvent::ProductArchived(_) => "products.product.archived",
            ProductEvent::BasePriceChanged(_) => "products.product.base_price_changed",
            ProductEvent::PricingTierAdded(_) => "products.pricing_tier.added",
            ProductEvent::PricingTierRemoved(_) => "products.pricing_tier.removed",
            ProductEvent::PricingTierDeactivated(_) => "products.pricing_tier.deactivated",
            ProductEvent::PricingTierReactivated(_) => "products.pricing_tier.reactivated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::ProductActivated(e) => e.occurred_at,
            ProductEvent::ProductArchived(e) => e.occurred_at,
            ProductEvent::BasePriceChanged(e) => e.occurred_at,
            ProductEvent::PricingTierAdded(e) => e.occurred_at,
            ProductEvent::PricingTierRemoved(e) => e.occurred_at,
            ProductEvent::PricingTierDeactivated(e) => e.occurred_at,
            ProductEvent::PricingTierReactivated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.sku = e.sku.clone();
                self.name = e.name.clone();
                self.status = ProductStatus::Draft;
                self.pricing = e.pricing.clone();
                self.tiers = PricingTierSet::new();
                self.created = true;
            }
            ProductEvent::ProductActivated(_) => {
                self.status = ProductStatus::Active;
            }
            ProductEvent::ProductArchived(_) => {
                self.status = ProductStatus::Archived;
            }
            ProductEvent::BasePriceChanged(e) => {
                self.pricing.base_price = Some(e.base_price);
            }
            ProductEvent::PricingTierAdded(e) => {
                self.tiers.insert(e.tier.clone());
            }
            ProductEvent::PricingTierRemoved(e) => {
                self.tiers.remove(e.tier_id);
            }
            ProductEvent::PricingTierDeactivated(e) => {
                self.tiers.set_active(e.tier_id, false);
            }
            ProductEvent::PricingTierReactivated(e) => {
                self.tiers.set_active(e.tier_id, true);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::ActivateProduct(cmd) => self.handle_activate(cmd),
            ProductCommand::ArchiveProduct(cmd) => self.handle_archive(cmd),
            ProductCommand::ChangeBasePrice(cmd) => self.handle_change_base_price(cmd),
            ProductCommand::AddPricingTier(cmd) => self.handle_add_tier(cmd),
            ProductCommand::RemovePricingTier(cmd) => self.handle_remove_tier(cmd),
            ProductCommand::DeactivatePricingTier(cmd) => self.handle_deactivate_tier(cmd),
            ProductCommand::ReactivatePricingTier(cmd) => self.handle_reactivate_tier(cmd),
            ProductCommand::ReplacePricingTier(cmd) => self.handle_replace_tier(cmd),
        }
    }
}

impl Product {
    fn ensure_exists(&self, product_id: ProductId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn ensure_repriceable(&self, product_id: ProductId) -> Result<(), DomainError> {
        self.ensure_exists(product_id)?;
        if self.status == ProductStatus::Archived {
            return Err(DomainError::invariant("archived products cannot be repriced"));
        }
        Ok(())
    }

    fn existing_tier(&self, tier_id: TierId) -> Result<&PricingTier, DomainError> {
        self.tiers.get(tier_id).ok_or_else(DomainError::not_found)
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        if cmd.sku.trim().is_empty() {
            return Err(DomainError::validation("SKU cannot be empty"));
        }

        // SKU uniqueness needs a catalog-wide view and is checked before dispatch.

        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            product_id: cmd.product_id,
            sku: cmd.sku.trim().to_string(),
            name: cmd.name.trim().to_string(),
            pricing: cmd.pricing.clone().unwrap_or_default(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_activate(&self, cmd: &ActivateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_exists(cmd.product_id)?;

        if self.status == ProductStatus::Active {
            return Err(DomainError::conflict("product is already active"));
        }

        if self.status == ProductStatus::Archived {
            return Err(DomainError::invariant("archived products cannot be activated"));
        }

        if self.pricing.base_price.is_none() {
            return Err(DomainError::validation("a base price is required before activation"));
        }

        Ok(vec![ProductEvent::ProductActivated(ProductActivated {
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_archive(&self, cmd: &ArchiveProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_exists(cmd.product_id)?;

        if self.status == ProductStatus::Archived {
            return Err(DomainError::conflict("product is already archived"));
        }

        Ok(vec![ProductEvent::ProductArchived(ProductArchived {
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_base_price(
        &self,
        cmd: &ChangeBasePrice,
    ) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_repriceable(cmd.product_id)?;

        if self.pricing.base_price == Some(cmd.base_price) {
            return Ok(vec![]);
        }

        Ok(vec![ProductEvent::BasePriceChanged(BasePriceChanged {
            product_id: cmd.product_id,
            base_price: cmd.base_price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_tier(&self, cmd: &AddPricingTier) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_repriceable(cmd.product_id)?;

        if self.tiers.get(cmd.tier_id).is_some() {
            return Err(DomainError::conflict(format!("tier {} already exists", cmd.tier_id)));
        }

        let admitted = validate(&self.tiers, &cmd.candidate)?;

        Ok(vec![ProductEvent::PricingTierAdded(PricingTierAdded {
            product_id: cmd.product_id,
            tier: PricingTier::new(cmd.tier_id, admitted),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_tier(
        &self,
        cmd: &RemovePricingTier,
    ) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_repriceable(cmd.product_id)?;
        self.existing_tier(cmd.tier_id)?;

        Ok(vec![ProductEvent::PricingTierRemoved(PricingTierRemoved {
            product_id: cmd.product_id,
            tier_id: cmd.tier_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deactivate_tier(
        &self,
        cmd: &DeactivatePricingTier,
    ) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_repriceable(cmd.product_id)?;

        if !self.existing_tier(cmd.tier_id)?.active {
            return Err(DomainError::conflict("tier is already inactive"));
        }

        Ok(vec![ProductEvent::PricingTierDeactivated(PricingTierDeactivated {
            product_id: cmd.product_id,
            tier_id: cmd.tier_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reactivate_tier(
        &self,
        cmd: &ReactivatePricingTier,
    ) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_repriceable(cmd.product_id)?;

        let tier = self.existing_tier(cmd.tier_id)?;
        if tier.active {
            return Err(DomainError::conflict("tier is already active"));
        }

        // Rejoining the active set is an admission like any other.
        validate(&self.tiers, &candidate_from(tier))?;

        Ok(vec![ProductEvent::PricingTierReactivated(PricingTierReactivated {
            product_id: cmd.product_id,
            tier_id: cmd.tier_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_replace_tier(
        &self,
        cmd: &ReplacePricingTier,
    ) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_repriceable(cmd.product_id)?;
        self.existing_tier(cmd.tier_id)?;

        if cmd.new_tier_id != cmd.tier_id && self.tiers.get(cmd.new_tier_id).is_some() {
            return Err(DomainError::conflict(format!("tier {} already exists", cmd.new_tier_id)));
        }

        let others = self.tiers.active().filter(|t| t.tier_id != cmd.tier_id);
        let admitted = validate_against(others, &cmd.candidate)?;

        Ok(vec![
            ProductEvent::PricingTierRemoved(PricingTierRemoved {
                product_id: cmd.product_id,
                tier_id: cmd.tier_id,
                occurred_at: cmd.occurred_at,
            }),
            ProductEvent::PricingTierAdded(PricingTierAdded {
                product_id: cmd.product_id,
                tier: PricingTier::new(cmd.new_tier_id, admitted),
                occurred_at: cmd.occurred_at,
            }),
        ])
    }
}

fn candidate_from(tier: &PricingTier) -> TierCandidate {
    TierCandidate {
        min_quantity: i64::try_from(tier.bounds.min_quantity).ok(),
        max_quantity: tier.bounds.max_quantity.and_then(|max| i64::try_from(max).ok()),
        unit_price: Some(tier.unit_price.amount()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use storefront_core::AggregateId;

    fn test_product_id() -> ProductId {
        ProductId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn q(n: u64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn create_cmd(product_id: ProductId, base_price: Option<&str>) -> CreateProduct {
        CreateProduct {
            product_id,
            sku: "SKU-001".to_string(),
            name: "Test Product".to_string(),
            pricing: Some(PricingMetadata {
                base_price: base_price.map(money),
                currency: Some("USD".to_string()),
            }),
            occurred_at: test_time(),
        }
    }

    fn execute(product: &mut Product, cmd: ProductCommand) -> Result<Vec<ProductEvent>, DomainError> {
        let events = product.handle(&cmd)?;
        for e in &events {
            product.apply(e);
        }
        Ok(events)
    }

    /// A created product with base price 12.00.
    fn created_product() -> Product {
        let product_id = test_product_id();
        let mut product = Product::empty(product_id);
        execute(&mut product, ProductCommand::CreateProduct(create_cmd(product_id, Some("12.00"))))
            .unwrap();
        product
    }

    fn add_tier(
        product: &mut Product,
        min: i64,
        max: Option<i64>,
        price: &str,
    ) -> Result<TierId, DomainError> {
        let tier_id = TierId::new();
        let product_id = product.id_typed();
        execute(
            product,
            ProductCommand::AddPricingTier(AddPricingTier {
                product_id,
                tier_id,
                candidate: TierCandidate::new(min, max, price.parse::<Decimal>().unwrap()),
                occurred_at: test_time(),
            }),
        )?;
        Ok(tier_id)
    }

    fn rejection_code(err: DomainError) -> &'static str {
        match err {
            DomainError::Rejected { code, .. } => code,
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn create_records_sku_name_and_pricing() {
        let product_id = test_product_id();
        let product = Product::empty(product_id);

        let events = product
            .handle(&ProductCommand::CreateProduct(create_cmd(product_id, Some("9.99"))))
            .unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            ProductEvent::ProductCreated(e) => {
                assert_eq!(e.product_id, product_id);
                assert_eq!(e.sku, "SKU-001");
                assert_eq!(e.pricing.base_price, Some(money("9.99")));
            }
            other => panic!("expected ProductCreated, got {other:?}"),
        }
    }

    #[test]
    fn create_product_rejects_blank_name_and_sku() {
        let product_id = test_product_id();
        let product = Product::empty(product_id);

        let mut cmd = create_cmd(product_id, None);
        cmd.name = "   ".to_string();
        assert!(matches!(
            product.handle(&ProductCommand::CreateProduct(cmd)),
            Err(DomainError::Validation(_))
        ));

        let mut cmd = create_cmd(product_id, None);
        cmd.sku = "".to_string();
        assert!(matches!(
            product.handle(&ProductCommand::CreateProduct(cmd)),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn second_create_conflicts() {
        let mut product = created_product();
        let cmd = create_cmd(product.id_typed(), None);
        let err = execute(&mut product, ProductCommand::CreateProduct(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn activation_requires_a_base_price() {
        let product_id = test_product_id();
        let mut product = Product::empty(product_id);
        execute(&mut product, ProductCommand::CreateProduct(create_cmd(product_id, None))).unwrap();

        let activate = ProductCommand::ActivateProduct(ActivateProduct {
            product_id,
            occurred_at: test_time(),
        });
        assert!(matches!(product.handle(&activate), Err(DomainError::Validation(_))));

        execute(
            &mut product,
            ProductCommand::ChangeBasePrice(ChangeBasePrice {
                product_id,
                base_price: money("4.00"),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        execute(&mut product, activate).unwrap();
        assert!(product.can_be_sold());
    }

    #[test]
    fn archived_products_cannot_be_activated_or_repriced() {
        let mut product = created_product();
        let product_id = product.id_typed();
        execute(
            &mut product,
            ProductCommand::ArchiveProduct(ArchiveProduct { product_id, occurred_at: test_time() }),
        )
        .unwrap();
        assert!(!product.can_be_sold());

        let err = execute(
            &mut product,
            ProductCommand::ActivateProduct(ActivateProduct { product_id, occurred_at: test_time() }),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));

        let err = add_tier(&mut product, 1, None, "1.00").unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(msg) if msg.contains("repriced")));
    }

    #[test]
    fn commands_on_missing_product_are_not_found() {
        let product_id = test_product_id();
        let product = Product::empty(product_id);
        let err = product
            .handle(&ProductCommand::ArchiveProduct(ArchiveProduct {
                product_id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
        assert_eq!(product.unit_price_for(q(1)).unwrap_err(), DomainError::NotFound);
    }

    #[test]
    fn added_tiers_price_their_band() {
        let mut product = created_product();
        add_tier(&mut product, 1, Some(9), "10.00").unwrap();
        add_tier(&mut product, 10, Some(49), "8.50").unwrap();
        add_tier(&mut product, 50, None, "7.00").unwrap();

        for (n, price) in [(5, "10.00"), (10, "8.50"), (49, "8.50"), (50, "7.00"), (500, "7.00")] {
            assert_eq!(product.unit_price_for(q(n)).unwrap().unit_price, money(price));
        }
        assert_eq!(product.version(), 4);
    }

    #[test]
    fn product_without_tiers_uses_base_price() {
        let product = created_product();
        let quote = product.unit_price_for(q(3)).unwrap();
        assert_eq!(quote.unit_price, money("12.00"));
        assert_eq!(quote.line_total, money("36.00"));
        assert_eq!(quote.tier_id, None);
    }

    #[test]
    fn overlapping_tier_is_rejected_and_state_is_untouched() {
        let mut product = created_product();
        add_tier(&mut product, 10, Some(50), "9.99").unwrap();
        let before = product.clone();

        let err = add_tier(&mut product, 40, Some(60), "9.00").unwrap_err();
        assert_eq!(rejection_code(err), "overlapping_range");
        assert_eq!(product, before);

        add_tier(&mut product, 51, Some(60), "9.00").unwrap();
        assert_eq!(product.tiers().len(), 2);
    }

    #[test]
    fn invalid_bounds_and_prices_are_rejected() {
        let mut product = created_product();
        assert_eq!(rejection_code(add_tier(&mut product, 0, None, "1").unwrap_err()), "invalid_bound");
        assert_eq!(
            rejection_code(add_tier(&mut product, 10, Some(5), "1").unwrap_err()),
            "invalid_bound"
        );
        assert_eq!(
            rejection_code(add_tier(&mut product, 1, None, "-1").unwrap_err()),
            "invalid_price"
        );
        assert!(product.tiers().is_empty());
    }

    #[test]
    fn removing_a_tier_frees_its_range() {
        let mut product = created_product();
        let id = add_tier(&mut product, 10, Some(50), "9.99").unwrap();
        assert!(add_tier(&mut product, 20, Some(30), "5").is_err());

        let product_id = product.id_typed();
        execute(
            &mut product,
            ProductCommand::RemovePricingTier(RemovePricingTier {
                product_id,
                tier_id: id,
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        add_tier(&mut product, 20, Some(30), "5").unwrap();
        assert_eq!(product.unit_price_for(q(25)).unwrap().unit_price, money("5"));
    }

    #[test]
    fn removing_unknown_tier_is_not_found() {
        let product = created_product();
        let err = product
            .handle(&ProductCommand::RemovePricingTier(RemovePricingTier {
                product_id: product.id_typed(),
                tier_id: TierId::new(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn deactivated_tier_stops_pricing_and_reactivation_is_revalidated() {
        let mut product = created_product();
        let product_id = product.id_typed();
        let bulk = add_tier(&mut product, 10, Some(50), "9.00").unwrap();

        execute(
            &mut product,
            ProductCommand::DeactivatePricingTier(DeactivatePricingTier {
                product_id,
                tier_id: bulk,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(product.unit_price_for(q(20)).unwrap().unit_price, money("12.00"));

        // The freed range gets taken while the old tier is parked.
        add_tier(&mut product, 20, None, "6.00").unwrap();

        let reactivate = ProductCommand::ReactivatePricingTier(ReactivatePricingTier {
            product_id,
            tier_id: bulk,
            occurred_at: test_time(),
        });
        assert_eq!(rejection_code(product.handle(&reactivate).unwrap_err()), "overlapping_range");
    }

    #[test]
    fn deactivating_twice_is_a_conflict() {
        let mut product = created_product();
        let product_id = product.id_typed();
        let id = add_tier(&mut product, 1, None, "1").unwrap();
        let cmd = ProductCommand::DeactivatePricingTier(DeactivatePricingTier {
            product_id,
            tier_id: id,
            occurred_at: test_time(),
        });
        execute(&mut product, cmd.clone()).unwrap();
        assert!(matches!(product.handle(&cmd), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn replace_checks_against_the_other_tiers_only() {
        let mut product = created_product();
        let product_id = product.id_typed();
        let small = add_tier(&mut product, 1, Some(9), "10.00").unwrap();
        add_tier(&mut product, 10, Some(49), "8.50").unwrap();

        // Widening `small` into 1-5 is fine even though it overlaps its old self.
        let new_id = TierId::new();
        let events = execute(
            &mut product,
            ProductCommand::ReplacePricingTier(ReplacePricingTier {
                product_id,
                tier_id: small,
                new_tier_id: new_id,
                candidate: TierCandidate::new(1, Some(5), Decimal::new(1100, 2)),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(events.len(), 2);
        assert!(product.tiers().get(small).is_none());
        assert_eq!(product.unit_price_for(q(3)).unwrap().unit_price, money("11.00"));
        assert_eq!(product.unit_price_for(q(7)).unwrap().unit_price, money("12.00"));

        // Growing into the neighbour's band is still an overlap.
        let err = product
            .handle(&ProductCommand::ReplacePricingTier(ReplacePricingTier {
                product_id,
                tier_id: new_id,
                new_tier_id: TierId::new(),
                candidate: TierCandidate::new(1, Some(20), Decimal::new(1100, 2)),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(rejection_code(err), "overlapping_range");
    }

    #[test]
    fn duplicate_tier_id_is_a_conflict() {
        let mut product = created_product();
        let id = add_tier(&mut product, 1, Some(9), "1").unwrap();
        let err = product
            .handle(&ProductCommand::AddPricingTier(AddPricingTier {
                product_id: product.id_typed(),
                tier_id: id,
                candidate: TierCandidate::new(100, None, Decimal::ONE),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn unchanged_base_price_emits_nothing() {
        let product = created_product();
        let events = product
            .handle(&ProductCommand::ChangeBasePrice(ChangeBasePrice {
                product_id: product.id_typed(),
                base_price: money("12.00"),
                occurred_at: test_time(),
            }))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn command_targets_its_product() {
        let product_id = test_product_id();
        let cmd = ProductCommand::ArchiveProduct(ArchiveProduct { product_id, occurred_at: test_time() });
        assert_eq!(cmd.target_aggregate_id(), product_id.0);
    }

    #[test]
    fn handling_a_tier_command_is_pure() {
        let mut product = created_product();
        add_tier(&mut product, 10, Some(50), "9.99").unwrap();
        let before = product.clone();

        let cmd = ProductCommand::AddPricingTier(AddPricingTier {
            product_id: product.id_typed(),
            tier_id: TierId::new(),
            candidate: TierCandidate::new(51, None, Decimal::ONE),
            occurred_at: test_time(),
        });
        let events1 = product.handle(&cmd).unwrap();
        let events2 = product.handle(&cmd).unwrap();

        assert_eq!(product, before);
        assert_eq!(events1, events2);
    }

    #[test]
    fn events_round_trip_through_json() {
        let mut product = created_product();
        add_tier(&mut product, 50, None, "7.00").unwrap();
        let event = ProductEvent::PricingTierAdded(PricingTierAdded {
            product_id: product.id_typed(),
            tier: product.tiers().iter().next().unwrap().clone(),
            occurred_at: test_time(),
        });

        let json = serde_json::to_value(&event).unwrap();
        let back: ProductEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
        assert_eq!(event.event_type(), "products.pricing_tier.added");
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 300,
                ..ProptestConfig::default()
            })]

            /// Replaying the same events yields the same product.
            #[test]
            fn replay_yields_same_tiers(
                bands in prop::collection::vec((1i64..100, prop::option::of(1i64..150), 0u32..2000), 0..15)
            ) {
                let mut original = created_product();
                let mut history = Vec::new();
                let product_id = original.id_typed();
                for (min, max, cents) in bands {
                    let cmd = ProductCommand::AddPricingTier(AddPricingTier {
                        product_id,
                        tier_id: TierId::new(),
                        candidate: TierCandidate::new(min, max, Decimal::new(cents as i64, 2)),
                        occurred_at: Utc::now(),
                    });
                    if let Ok(events) = execute(&mut original, cmd) {
                        history.extend(events);
                    }
                }

                let mut replayed = Product { id: product_id, ..created_product() };
                replayed.replay(&history);

                prop_assert_eq!(replayed.tiers(), original.tiers());
                prop_assert!(storefront_pricing::validate_set(replayed.tiers()).is_ok());
            }

            /// Whatever was admitted, every quantity resolves without panicking
            /// and to either a tier price or the base price.
            #[test]
            fn every_quantity_prices(
                bands in prop::collection::vec((1i64..100, prop::option::of(1i64..150), 0u32..2000), 0..15),
                quantity in 1u64..200,
            ) {
                let mut product = created_product();
                for (min, max, cents) in bands {
                    let _ = add_tier(&mut product, min, max, &Decimal::new(cents as i64, 2).to_string());
                }
                let quote = product.unit_price_for(q(quantity)).unwrap();
                match quote.tier_id {
                    Some(id) => prop_assert_eq!(
                        product.tiers().get(id).map(|t| t.unit_price),
                        Some(quote.unit_price)
                    ),
                    None => prop_assert_eq!(quote.unit_price, money("12.00")),
                }
            }
        }
    }
}
