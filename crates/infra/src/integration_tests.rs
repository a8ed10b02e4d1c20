//! Integration tests for the full pipeline:
//! Command → EventStore → EventBus → catalog projection, plus checkout.
//!
//! Verifies:
//! - tier commands update the catalog read model
//! - two tier creations decided against the same snapshot cannot both commit
//! - order lines keep the price resolved when they were added

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::Value as JsonValue;

    use storefront_core::{AggregateId, Money, Quantity, TierId};
    use storefront_events::{EventBus, EventEnvelope, InMemoryEventBus};
    use storefront_pricing::{TierBounds, TierCandidate};
    use storefront_products::{
        ActivateProduct, AddPricingTier, CreateProduct, DeactivatePricingTier, PricingMetadata,
        Product, ProductCommand, ProductId, ReplacePricingTier,
    };
    use storefront_sales::{CreateSalesOrder, SalesOrder, SalesOrderCommand, SalesOrderId};

    use crate::aggregate_types::{PRODUCT, SALES_ORDER};
    use crate::checkout::CheckoutService;
    use crate::command_dispatcher::{CommandDispatcher, DispatchError};
    use crate::event_store::InMemoryEventStore;
    use crate::projections::{CatalogEntry, ProductCatalogProjection};
    use crate::read_model::InMemoryReadStore;

    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
    type Dispatcher = CommandDispatcher<Arc<InMemoryEventStore>, Bus>;
    type Catalog = ProductCatalogProjection<Arc<InMemoryReadStore<ProductId, CatalogEntry>>>;

    fn setup() -> (Arc<Dispatcher>, Arc<Catalog>) {
        let store = Arc::new(InMemoryEventStore::new());
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let dispatcher = Arc::new(CommandDispatcher::new(store, bus.clone()));
        let catalog = Arc::new(ProductCatalogProjection::new(Arc::new(InMemoryReadStore::new())));

        // Subscribe before anything is published.
        let catalog_clone = catalog.clone();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<()>();
        std::thread::spawn(move || {
            let sub = bus.subscribe();
            let _ = ready_tx.send(());
            for env in sub.iter() {
                if let Err(e) = catalog_clone.apply_envelope(&env) {
                    eprintln!("Failed to apply envelope: {e:?}");
                }
            }
        });
        let _ = ready_rx.recv_timeout(std::time::Duration::from_secs(1));

        (dispatcher, catalog)
    }

    fn wait_for_processing() {
        std::thread::sleep(std::time::Duration::from_millis(50));
    }

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn q(n: u64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn candidate(min: i64, max: Option<i64>, price: &str) -> TierCandidate {
        TierCandidate::new(min, max, price.parse::<Decimal>().unwrap())
    }

    fn product_cmd(d: &Dispatcher, cmd: ProductCommand) -> Result<usize, DispatchError> {
        d.dispatch(PRODUCT, cmd, |id| Product::empty(ProductId::new(id)))
            .map(|events| events.len())
    }

    fn add_tier(d: &Dispatcher, product_id: ProductId, c: TierCandidate) -> Result<TierId, DispatchError> {
        let tier_id = TierId::new();
        product_cmd(
            d,
            ProductCommand::AddPricingTier(AddPricingTier {
                product_id,
                tier_id,
                candidate: c,
                occurred_at: Utc::now(),
            }),
        )?;
        Ok(tier_id)
    }

    fn active_product(d: &Dispatcher, base: &str) -> ProductId {
        let product_id = ProductId::new(AggregateId::new());
        product_cmd(
            d,
            ProductCommand::CreateProduct(CreateProduct {
                product_id,
                sku: format!("SKU-{product_id}"),
                name: "Widget".to_string(),
                pricing: Some(PricingMetadata {
                    base_price: Some(money(base)),
                    currency: Some("USD".to_string()),
                }),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        product_cmd(
            d,
            ProductCommand::ActivateProduct(ActivateProduct {
                product_id,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        product_id
    }

    fn new_order(d: &Dispatcher) -> SalesOrderId {
        let order_id = SalesOrderId::new(AggregateId::new());
        d.dispatch(
            SALES_ORDER,
            SalesOrderCommand::CreateSalesOrder(CreateSalesOrder {
                order_id,
                occurred_at: Utc::now(),
            }),
            |id| SalesOrder::empty(SalesOrderId::new(id)),
        )
        .unwrap();
        order_id
    }

    fn load_product(d: &Dispatcher, product_id: ProductId) -> Product {
        d.load(product_id.0, |id| Product::empty(ProductId::new(id))).unwrap()
    }

    #[test]
    fn tier_commands_reach_the_catalog() {
        let (dispatcher, catalog) = setup();
        let product_id = active_product(&dispatcher, "12.00");

        add_tier(&dispatcher, product_id, candidate(1, Some(9), "10.00")).unwrap();
        let mid = add_tier(&dispatcher, product_id, candidate(10, Some(49), "8.50")).unwrap();
        add_tier(&dispatcher, product_id, candidate(50, None, "7.00")).unwrap();
        product_cmd(
            &dispatcher,
            ProductCommand::DeactivatePricingTier(DeactivatePricingTier {
                product_id,
                tier_id: mid,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();

        wait_for_processing();

        let entry = catalog.get(&product_id).expect("catalog entry");
        assert_eq!(entry.tiers.len(), 3);
        assert_eq!(entry.tiers.active().count(), 2);
        assert!(!entry.tiers.get(mid).unwrap().active);
    }

    #[test]
    fn rejected_tier_leaves_no_trace() {
        let (dispatcher, catalog) = setup();
        let product_id = active_product(&dispatcher, "12.00");
        add_tier(&dispatcher, product_id, candidate(10, Some(50), "9.00")).unwrap();

        let err = add_tier(&dispatcher, product_id, candidate(40, Some(60), "8.00")).unwrap_err();
        match err {
            DispatchError::Rejected { code, reason } => {
                assert_eq!(code, "overlapping_range");
                assert!(reason.contains("10-50"), "reason: {reason}");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }

        wait_for_processing();
        assert_eq!(catalog.get(&product_id).unwrap().tiers.len(), 1);
        assert_eq!(dispatcher.history(product_id.0).unwrap().len(), 3);
    }

    #[test]
    fn stale_snapshot_cannot_commit_an_overlapping_tier() {
        let (dispatcher, _catalog) = setup();
        let product_id = active_product(&dispatcher, "12.00");

        // Two administrators open the same product.
        let seen_by_first = load_product(&dispatcher, product_id);
        let seen_by_second = load_product(&dispatcher, product_id);

        let first = ProductCommand::AddPricingTier(AddPricingTier {
            product_id,
            tier_id: TierId::new(),
            candidate: candidate(10, Some(50), "9.00"),
            occurred_at: Utc::now(),
        });
        let second = ProductCommand::AddPricingTier(AddPricingTier {
            product_id,
            tier_id: TierId::new(),
            candidate: candidate(40, Some(60), "8.00"),
            occurred_at: Utc::now(),
        });

        // Each passes validation against its own snapshot...
        dispatcher
            .execute(&seen_by_first, product_id.0, PRODUCT, &first)
            .unwrap();
        let err = dispatcher
            .execute(&seen_by_second, product_id.0, PRODUCT, &second)
            .unwrap_err();
        // ...but only the first can append.
        assert!(err.is_concurrency(), "got {err:?}");

        // Retrying through dispatch re-validates against fresh state.
        let err = product_cmd(&dispatcher, second).unwrap_err();
        assert!(matches!(err, DispatchError::Rejected { code: "overlapping_range", .. }));

        let product = load_product(&dispatcher, product_id);
        assert_eq!(product.tiers().active().count(), 1);
    }

    #[test]
    fn concurrent_overlapping_tiers_admit_exactly_one() {
        let (dispatcher, _catalog) = setup();
        let product_id = active_product(&dispatcher, "12.00");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let dispatcher = dispatcher.clone();
                std::thread::spawn(move || {
                    add_tier(&dispatcher, product_id, candidate(1 + i, None, "5.00"))
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        for err in results.into_iter().filter_map(Result::err) {
            assert!(
                matches!(err, DispatchError::Rejected { code: "overlapping_range", .. })
                    || err.is_concurrency(),
                "unexpected error {err:?}"
            );
        }
        let product = load_product(&dispatcher, product_id);
        assert_eq!(product.tiers().active().count(), 1);
    }

    #[test]
    fn replace_swaps_a_tier_atomically() {
        let (dispatcher, _catalog) = setup();
        let product_id = active_product(&dispatcher, "12.00");
        let low = add_tier(&dispatcher, product_id, candidate(1, Some(9), "10.00")).unwrap();
        add_tier(&dispatcher, product_id, candidate(10, None, "8.00")).unwrap();

        // Widening into the neighbour is refused; the old tier stays.
        let err = product_cmd(
            &dispatcher,
            ProductCommand::ReplacePricingTier(ReplacePricingTier {
                product_id,
                tier_id: low,
                new_tier_id: TierId::new(),
                candidate: candidate(1, Some(10), "9.50"),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap_err();
        assert!(matches!(err, DispatchError::Rejected { code: "overlapping_range", .. }));
        assert!(load_product(&dispatcher, product_id).tiers().get(low).is_some());

        let replacement = TierId::new();
        let committed = product_cmd(
            &dispatcher,
            ProductCommand::ReplacePricingTier(ReplacePricingTier {
                product_id,
                tier_id: low,
                new_tier_id: replacement,
                candidate: candidate(1, Some(9), "9.50"),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        assert_eq!(committed, 2);

        let product = load_product(&dispatcher, product_id);
        assert!(product.tiers().get(low).is_none());
        assert_eq!(
            product.tiers().get(replacement).unwrap().bounds,
            TierBounds::new(1, Some(9))
        );
    }

    #[test]
    fn checkout_prices_lines_from_tiers() {
        let (dispatcher, _catalog) = setup();
        let checkout = CheckoutService::new(dispatcher.clone());
        let product_id = active_product(&dispatcher, "12.00");
        add_tier(&dispatcher, product_id, candidate(1, Some(9), "10.00")).unwrap();
        let mid = add_tier(&dispatcher, product_id, candidate(10, Some(49), "8.50")).unwrap();
        add_tier(&dispatcher, product_id, candidate(50, None, "7.00")).unwrap();

        let order_id = new_order(&dispatcher);
        let priced = checkout.add_line(order_id, product_id, q(10)).unwrap();
        assert_eq!(priced.unit_price, money("8.50"));
        assert_eq!(priced.tier_id, Some(mid));
        checkout.add_line(order_id, product_id, q(500)).unwrap();

        let order = dispatcher
            .load(order_id.0, |id| SalesOrder::empty(SalesOrderId::new(id)))
            .unwrap();
        assert_eq!(order.lines().len(), 2);
        assert_eq!(order.lines()[0].line_total, money("85.00"));
        assert_eq!(order.lines()[1].unit_price, money("7.00"));
        assert_eq!(order.total().unwrap(), money("3585.00"));
    }

    #[test]
    fn recorded_lines_survive_tier_changes() {
        let (dispatcher, _catalog) = setup();
        let checkout = CheckoutService::new(dispatcher.clone());
        let product_id = active_product(&dispatcher, "12.00");
        let tier = add_tier(&dispatcher, product_id, candidate(10, None, "8.00")).unwrap();

        let order_id = new_order(&dispatcher);
        checkout.add_line(order_id, product_id, q(20)).unwrap();

        product_cmd(
            &dispatcher,
            ProductCommand::DeactivatePricingTier(DeactivatePricingTier {
                product_id,
                tier_id: tier,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();

        assert_eq!(checkout.quote(product_id, q(20)).unwrap().unit_price, money("12.00"));
        let order = dispatcher
            .load(order_id.0, |id| SalesOrder::empty(SalesOrderId::new(id)))
            .unwrap();
        assert_eq!(order.lines()[0].unit_price, money("8.00"));
    }

    #[test]
    fn draft_products_cannot_be_sold() {
        let (dispatcher, _catalog) = setup();
        let checkout = CheckoutService::new(dispatcher.clone());
        let product_id = ProductId::new(AggregateId::new());
        product_cmd(
            &dispatcher,
            ProductCommand::CreateProduct(CreateProduct {
                product_id,
                sku: "DRAFT-1".to_string(),
                name: "Draft".to_string(),
                pricing: None,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();

        let order_id = new_order(&dispatcher);
        let err = checkout.add_line(order_id, product_id, q(1)).unwrap_err();
        assert!(matches!(err, DispatchError::InvariantViolation(_)));

        let err = checkout.add_line(order_id, ProductId::new(AggregateId::new()), q(1)).unwrap_err();
        assert!(matches!(err, DispatchError::NotFound));
    }

    #[test]
    fn committed_events_are_published_with_their_type() {
        let store = Arc::new(InMemoryEventStore::new());
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let sub = bus.subscribe();
        let dispatcher = CommandDispatcher::new(store, bus);

        let product_id = active_product(&dispatcher, "12.00");
        add_tier(&dispatcher, product_id, candidate(5, None, "3.00")).unwrap();

        let types: Vec<String> = sub.drain().into_iter().map(|e| e.event_type().to_string()).collect();
        assert_eq!(
            types,
            vec![
                "products.product.created",
                "products.product.activated",
                "products.pricing_tier.added",
            ]
        );
    }
}
