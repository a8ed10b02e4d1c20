//! Infrastructure layer: event store, command dispatch, read models,
//! checkout orchestration and configuration.

pub mod checkout;
pub mod command_dispatcher;
pub mod config;
pub mod event_store;
pub mod projections;
pub mod read_model;

mod integration_tests;

/// Stream type names used when appending and when routing published events.
pub mod aggregate_types {
    pub const PRODUCT: &str = "products.product";
    pub const SALES_ORDER: &str = "sales.order";
}

pub use checkout::CheckoutService;
pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use config::{AppConfig, ConfigError, LogFormat};
