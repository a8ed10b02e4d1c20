use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{
    Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult, Money, Quantity, TierId,
};
use storefront_events::{Command, Event};
use storefront_products::ProductId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SalesOrderId(pub AggregateId);

impl SalesOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SalesOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalesOrderStatus {
    /// Open for new lines.
    Draft,
    /// Closed; lines and prices are final.
    Confirmed,
}

/// One product on an order, priced when it was added.
///
/// `unit_price` and `line_total` are copied into the order's own stream, so
/// repricing the product later leaves them alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub line_no: u32,
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub line_total: Money,
    /// Band that set `unit_price`; `None` when the base price applied.
    pub tier_id: Option<TierId>,
}

/// A customer order, rebuilt from its `sales.order` stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesOrder {
    id: SalesOrderId,
    opened_at: Option<DateTime<Utc>>,
    status: SalesOrderStatus,
    lines: Vec<OrderLine>,
    version: u64,
}

impl SalesOrder {
    /// Blank instance to replay a stream into.
    pub fn empty(id: SalesOrderId) -> Self {
        Self {
            id,
            opened_at: None,
            status: SalesOrderStatus::Draft,
            lines: Vec::new(),
            version: 0,
        }
    }

    pub fn id_typed(&self) -> SalesOrderId {
        self.id
    }

    pub fn exists(&self) -> bool {
        self.opened_at.is_some()
    }

    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        self.opened_at
    }

    pub fn status(&self) -> SalesOrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn is_modifiable(&self) -> bool {
        self.status == SalesOrderStatus::Draft
    }

    pub fn total(&self) -> DomainResult<Money> {
        self.lines
            .iter()
            .try_fold(Money::ZERO, |sum, line| sum.checked_add(line.line_total))
    }

    /// The order must exist under `order_id` and still be a draft.
    fn open_draft(&self, order_id: SalesOrderId) -> DomainResult<()> {
        self.existing(order_id)?;
        if !self.is_modifiable() {
            return Err(DomainError::invariant(format!("order {order_id} is already confirmed")));
        }
        Ok(())
    }

    fn existing(&self, order_id: SalesOrderId) -> DomainResult<()> {
        match self.opened_at {
            None => Err(DomainError::not_found()),
            Some(_) if self.id != order_id => Err(DomainError::invariant(format!(
                "command for order {order_id} routed to order {}",
                self.id
            ))),
            Some(_) => Ok(()),
        }
    }
}

impl AggregateRoot for SalesOrder {
    type Id = SalesOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSalesOrder {
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Append a line at a price the caller already resolved from the product's
/// tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLine {
    pub order_id: SalesOrderId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub tier_id: Option<TierId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmOrder {
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalesOrderCommand {
    CreateSalesOrder(CreateSalesOrder),
    AddLine(AddLine),
    ConfirmOrder(ConfirmOrder),
}

impl SalesOrderCommand {
    pub fn order_id(&self) -> SalesOrderId {
        match self {
            Self::CreateSalesOrder(c) => c.order_id,
            Self::AddLine(c) => c.order_id,
            Self::ConfirmOrder(c) => c.order_id,
        }
    }
}

impl Command for SalesOrderCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        self.order_id().0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrderCreated {
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAdded {
    pub order_id: SalesOrderId,
    pub line: OrderLine,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmed {
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalesOrderEvent {
    SalesOrderCreated(SalesOrderCreated),
    LineAdded(LineAdded),
    OrderConfirmed(OrderConfirmed),
}

impl Event for SalesOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::SalesOrderCreated(_) => "sales.order.created",
            Self::LineAdded(_) => "sales.order.line_added",
            Self::OrderConfirmed(_) => "sales.order.confirmed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::SalesOrderCreated(e) => e.occurred_at,
            Self::LineAdded(e) => e.occurred_at,
            Self::OrderConfirmed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for SalesOrder {
    type Command = SalesOrderCommand;
    type Event = SalesOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SalesOrderEvent::SalesOrderCreated(e) => {
                *self = Self::empty(e.order_id);
                self.opened_at = Some(e.occurred_at);
            }
            SalesOrderEvent::LineAdded(e) => self.lines.push(e.line.clone()),
            SalesOrderEvent::OrderConfirmed(_) => self.status = SalesOrderStatus::Confirmed,
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let event = match command {
            SalesOrderCommand::CreateSalesOrder(cmd) => {
                if self.exists() {
                    return Err(DomainError::conflict(format!("order {} already exists", cmd.order_id)));
                }
                SalesOrderEvent::SalesOrderCreated(SalesOrderCreated {
                    order_id: cmd.order_id,
                    occurred_at: cmd.occurred_at,
                })
            }
            SalesOrderCommand::AddLine(cmd) => {
                self.open_draft(cmd.order_id)?;
                SalesOrderEvent::LineAdded(LineAdded {
                    order_id: cmd.order_id,
                    line: OrderLine {
                        line_no: self.lines.len() as u32 + 1,
                        product_id: cmd.product_id,
                        quantity: cmd.quantity,
                        unit_price: cmd.unit_price,
                        line_total: cmd.unit_price.times(cmd.quantity)?,
                        tier_id: cmd.tier_id,
                    },
                    occurred_at: cmd.occurred_at,
                })
            }
            SalesOrderCommand::ConfirmOrder(cmd) => {
                self.open_draft(cmd.order_id)?;
                if self.lines.is_empty() {
                    return Err(DomainError::validation("an order needs at least one line"));
                }
                SalesOrderEvent::OrderConfirmed(OrderConfirmed {
                    order_id: cmd.order_id,
                    occurred_at: cmd.occurred_at,
                })
            }
        };
        Ok(vec![event])
    }
}
