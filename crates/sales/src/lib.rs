//! Sales orders domain module (event-sourced).
//!
//! Orders record lines at the unit price resolved when the line was added.
//! Pure domain logic: no IO, no HTTP, no storage.

pub mod order;

pub use order::{
    AddLine, ConfirmOrder, CreateSalesOrder, LineAdded, OrderConfirmed, OrderLine, SalesOrder,
    SalesOrderCommand, SalesOrderCreated, SalesOrderEvent, SalesOrderId, SalesOrderStatus,
};
