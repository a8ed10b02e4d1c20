use serde::Deserialize;
use serde_json::json;

use storefront_core::{Money, Quantity};
use storefront_infra::event_store::StoredEvent;
use storefront_infra::projections::CatalogEntry;
use storefront_pricing::{PriceQuote, PricingTier, PricingTierSet, TierForm};
use storefront_products::Product;
use storefront_sales::{OrderLine, SalesOrder};

/// A form field as it arrives in JSON: admin tools send text, scripts send
/// numbers. Both are read as the text the administrator typed.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(serde_json::Number),
}

impl FieldValue {
    pub fn into_text(self) -> String {
        match self {
            FieldValue::Text(s) => s,
            FieldValue::Number(n) => n.to_string(),
        }
    }
}

fn text(field: Option<FieldValue>) -> Option<String> {
    field.map(FieldValue::into_text)
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub base_price: Option<FieldValue>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeBasePriceRequest {
    pub base_price: FieldValue,
}

/// Tier form submission. Every field is optional here; missing or blank
/// fields are reported by validation.
#[derive(Debug, Default, Deserialize)]
pub struct TierRequest {
    #[serde(default)]
    pub min_quantity: Option<FieldValue>,
    #[serde(default)]
    pub max_quantity: Option<FieldValue>,
    #[serde(default)]
    pub unit_price: Option<FieldValue>,
}

impl TierRequest {
    pub fn into_form(self) -> TierForm {
        TierForm {
            min_quantity: text(self.min_quantity),
            max_quantity: text(self.max_quantity),
            unit_price: text(self.unit_price),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    pub quantity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddLineRequest {
    pub product_id: String,
    pub quantity: Option<FieldValue>,
}

/// Parse a quantity field: a whole number of at least 1.
pub fn parse_quantity(raw: Option<String>) -> Result<Quantity, String> {
    let raw = raw.ok_or_else(|| "quantity is required".to_string())?;
    raw.parse::<Quantity>().map_err(|e| e.to_string())
}

pub fn parse_money(raw: FieldValue) -> Result<Money, String> {
    raw.into_text().parse::<Money>().map_err(|e| e.to_string())
}

pub fn tier_to_json(tier: &PricingTier) -> serde_json::Value {
    json!({
        "tier_id": tier.tier_id.to_string(),
        "min_quantity": tier.bounds.min_quantity,
        "max_quantity": tier.bounds.max_quantity,
        "unit_price": tier.unit_price,
        "active": tier.active,
    })
}

/// Tiers ordered by `min_quantity`, active and inactive alike.
fn tiers_to_json(tiers: &PricingTierSet) -> Vec<serde_json::Value> {
    let mut sorted: Vec<&PricingTier> = tiers.iter().collect();
    sorted.sort_by_key(|t| (t.bounds.min_quantity, t.tier_id));
    sorted.into_iter().map(tier_to_json).collect()
}

pub fn product_to_json(product: &Product) -> serde_json::Value {
    json!({
        "id": product.id_typed().to_string(),
        "sku": product.sku(),
        "name": product.name(),
        "status": product.status(),
        "pricing": {
            "base_price": product.pricing().base_price,
            "currency": product.pricing().currency,
        },
        "tiers": tiers_to_json(product.tiers()),
    })
}

pub fn catalog_entry_to_json(entry: &CatalogEntry) -> serde_json::Value {
    json!({
        "id": entry.product_id.to_string(),
        "sku": entry.sku,
        "name": entry.name,
        "status": entry.status,
        "pricing": {
            "base_price": entry.pricing.base_price,
            "currency": entry.pricing.currency,
        },
        "tiers": tiers_to_json(&entry.tiers),
    })
}

pub fn quote_to_json(quote: &PriceQuote) -> serde_json::Value {
    json!({
        "quantity": quote.quantity,
        "unit_price": quote.unit_price,
        "line_total": quote.line_total,
        "tier_id": quote.tier_id.map(|id| id.to_string()),
        "source": if quote.tier_id.is_some() { "tier" } else { "base_price" },
    })
}

fn line_to_json(line: &OrderLine) -> serde_json::Value {
    json!({
        "line_no": line.line_no,
        "product_id": line.product_id.to_string(),
        "quantity": line.quantity,
        "unit_price": line.unit_price,
        "line_total": line.line_total,
        "tier_id": line.tier_id.map(|id| id.to_string()),
    })
}

pub fn order_to_json(order: &SalesOrder) -> serde_json::Value {
    json!({
        "id": order.id_typed().to_string(),
        "status": order.status(),
        "opened_at": order.opened_at(),
        "lines": order.lines().iter().map(line_to_json).collect::<Vec<_>>(),
        "total": order.total().ok(),
    })
}

pub fn event_to_json(event: &StoredEvent) -> serde_json::Value {
    json!({
        "event_id": event.event_id.to_string(),
        "sequence_number": event.sequence_number,
        "event_type": event.event_type,
        "occurred_at": event.occurred_at,
        "payload": event.payload,
    })
}
