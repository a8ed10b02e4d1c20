//! Price resolution at order time.
//!
//! The price of a line is fixed when the line is added: the product is
//! rehydrated, its active tiers resolve the unit price for the requested
//! quantity, and the order records that price. Later tier changes do not
//! touch lines already on an order.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;

use storefront_core::Quantity;
use storefront_events::{EventBus, EventEnvelope};
use storefront_pricing::PriceQuote;
use storefront_products::{Product, ProductId};
use storefront_sales::{AddLine, SalesOrder, SalesOrderCommand, SalesOrderId};

use crate::aggregate_types::{PRODUCT, SALES_ORDER};
use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::EventStore;

/// Adds priced lines to sales orders.
#[derive(Debug)]
pub struct CheckoutService<S, B> {
    dispatcher: Arc<CommandDispatcher<S, B>>,
}

impl<S, B> Clone for CheckoutService<S, B> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<S, B> CheckoutService<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(dispatcher: Arc<CommandDispatcher<S, B>>) -> Self {
        Self { dispatcher }
    }

    /// Current price of `quantity` units of a product, without touching any
    /// order.
    pub fn quote(&self, product_id: ProductId, quantity: Quantity) -> Result<PriceQuote, DispatchError> {
        let product = self.load_product(product_id)?;
        Ok(product.unit_price_for(quantity)?)
    }

    /// Resolve the unit price for `quantity` and append the line to the order.
    ///
    /// Only active products can be sold. The returned quote is what the line
    /// was recorded with.
    pub fn add_line(
        &self,
        order_id: SalesOrderId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<PriceQuote, DispatchError> {
        let product = self.load_product(product_id)?;
        if !product.can_be_sold() {
            return Err(DispatchError::InvariantViolation(format!(
                "product {} is not active",
                product.sku()
            )));
        }
        let priced = product.unit_price_for(quantity)?;

        tracing::debug!(
            %order_id,
            %product_id,
            %quantity,
            unit_price = %priced.unit_price,
            tier_id = ?priced.tier_id,
            "resolved line price"
        );

        self.dispatcher.dispatch(
            SALES_ORDER,
            SalesOrderCommand::AddLine(AddLine {
                order_id,
                product_id,
                quantity,
                unit_price: priced.unit_price,
                tier_id: priced.tier_id,
                occurred_at: Utc::now(),
            }),
            |id| SalesOrder::empty(SalesOrderId::new(id)),
        )?;

        Ok(priced)
    }

    fn load_product(&self, product_id: ProductId) -> Result<Product, DispatchError> {
        let product = self
            .dispatcher
            .load(product_id.0, |id| Product::empty(ProductId::new(id)))?;
        if !product.exists() {
            return Err(DispatchError::NotFound);
        }
        Ok(product)
    }
}
