use std::sync::Arc;

use serde_json::Value as JsonValue;

use storefront_events::{EventBus, EventEnvelope, InMemoryEventBus};
use storefront_infra::{
    CheckoutService,
    aggregate_types::{PRODUCT, SALES_ORDER},
    command_dispatcher::{CommandDispatcher, DispatchError},
    event_store::{InMemoryEventStore, StoredEvent},
    projections::{CatalogEntry, ProductCatalogProjection},
    read_model::InMemoryReadStore,
};
use storefront_products::{Product, ProductCommand, ProductId};
use storefront_sales::{SalesOrder, SalesOrderCommand, SalesOrderId};

type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
type Dispatcher = CommandDispatcher<Arc<InMemoryEventStore>, Bus>;
type Catalog = ProductCatalogProjection<Arc<InMemoryReadStore<ProductId, CatalogEntry>>>;

/// Everything the handlers need: the dispatcher, checkout and the catalog
/// read model.
pub struct AppServices {
    dispatcher: Arc<Dispatcher>,
    checkout: CheckoutService<Arc<InMemoryEventStore>, Bus>,
    catalog: Arc<Catalog>,
}

/// Wire the in-memory store, bus, dispatcher and catalog projection.
///
/// Spawns the bus subscriber that feeds the catalog, so this must run inside
/// a Tokio runtime.
pub fn build_services(dispatch_attempts: u32) -> AppServices {
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Bus = Arc::new(InMemoryEventBus::new());
    let dispatcher = Arc::new(CommandDispatcher::new(store, bus.clone()).with_max_attempts(dispatch_attempts));
    let catalog: Arc<Catalog> = Arc::new(ProductCatalogProjection::new(Arc::new(InMemoryReadStore::new())));

    // Background subscriber: bus -> catalog. Subscribed before any command
    // can run, so nothing is missed.
    {
        let sub = bus.subscribe();
        let catalog = catalog.clone();
        tokio::task::spawn_blocking(move || {
            for env in sub.iter() {
                if let Err(e) = catalog.apply_envelope(&env) {
                    tracing::warn!(
                        aggregate_id = %env.aggregate_id(),
                        sequence_number = env.sequence_number(),
                        "catalog projection apply failed: {e}"
                    );
                }
            }
        });
    }

    AppServices {
        checkout: CheckoutService::new(dispatcher.clone()),
        dispatcher,
        catalog,
    }
}

impl AppServices {
    pub fn dispatch_product(&self, command: ProductCommand) -> Result<Vec<StoredEvent>, DispatchError> {
        self.dispatcher
            .dispatch(PRODUCT, command, |id| Product::empty(ProductId::new(id)))
    }

    pub fn dispatch_order(&self, command: SalesOrderCommand) -> Result<Vec<StoredEvent>, DispatchError> {
        self.dispatcher
            .dispatch(SALES_ORDER, command, |id| SalesOrder::empty(SalesOrderId::new(id)))
    }

    /// Current product state, straight from its stream.
    pub fn load_product(&self, product_id: ProductId) -> Result<Product, DispatchError> {
        let product = self
            .dispatcher
            .load(product_id.0, |id| Product::empty(ProductId::new(id)))?;
        if !product.exists() {
            return Err(DispatchError::NotFound);
        }
        Ok(product)
    }

    pub fn load_order(&self, order_id: SalesOrderId) -> Result<SalesOrder, DispatchError> {
        let order = self
            .dispatcher
            .load(order_id.0, |id| SalesOrder::empty(SalesOrderId::new(id)))?;
        if !order.exists() {
            return Err(DispatchError::NotFound);
        }
        Ok(order)
    }

    pub fn product_history(&self, product_id: ProductId) -> Result<Vec<StoredEvent>, DispatchError> {
        let history = self.dispatcher.history(product_id.0)?;
        if history.is_empty() {
            return Err(DispatchError::NotFound);
        }
        Ok(history)
    }

    pub fn checkout(&self) -> &CheckoutService<Arc<InMemoryEventStore>, Bus> {
        &self.checkout
    }

    /// Catalog listing (eventually consistent with the command side).
    pub fn catalog_list(&self) -> Vec<CatalogEntry> {
        self.catalog.list()
    }

    pub fn sku_taken(&self, sku: &str) -> bool {
        let sku = sku.trim();
        self.catalog.list().iter().any(|e| e.sku.eq_ignore_ascii_case(sku))
    }
}
