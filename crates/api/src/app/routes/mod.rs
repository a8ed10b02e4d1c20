use axum::Router;
use axum::response::Response;

use storefront_core::{AggregateId, TierId};
use storefront_products::ProductId;
use storefront_sales::SalesOrderId;

use crate::app::errors;

pub mod orders;
pub mod products;
pub mod system;
pub mod tiers;

pub fn router() -> Router {
    Router::new()
        .nest("/products", products::router().merge(tiers::router()))
        .nest("/orders", orders::router())
}

pub(crate) fn parse_product_id(raw: &str) -> Result<ProductId, Response> {
    raw.parse::<AggregateId>()
        .map(ProductId::new)
        .map_err(errors::invalid_id)
}

pub(crate) fn parse_order_id(raw: &str) -> Result<SalesOrderId, Response> {
    raw.parse::<AggregateId>()
        .map(SalesOrderId::new)
        .map_err(errors::invalid_id)
}

pub(crate) fn parse_tier_id(raw: &str) -> Result<TierId, Response> {
    raw.parse::<TierId>().map_err(errors::invalid_id)
}
