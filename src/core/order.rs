//! Order business logic - checkout snapshots and the fulfilment status workflow.
//!
//! Orders are stored as one JSON array under the `orders` key. Both the
//! storefront (placing orders) and the admin dashboard (changing status) write
//! that array, so every mutation re-reads it from storage first and then writes
//! the whole list back.

use crate::core::cart::CartItem;
use crate::core::storage::{self, StorageKey};
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, instrument};

/// Fulfilment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed, not yet worked on
    Pending,
    /// Being prepared
    Processing,
    /// Handed to the courier
    Shipped,
    /// Received by the customer (terminal)
    Delivered,
    /// Abandoned (terminal)
    Cancelled,
}

impl OrderStatus {
    /// All statuses in workflow order
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Lowercase name as stored in JSON
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further transitions are allowed from this status
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether `next` is an edge of the fulfilment graph.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing | Self::Cancelled)
                | (Self::Processing, Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::Delivered)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How strictly [`OrderBook::update_status`] treats the fulfilment graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    /// Any status may be set from any other
    #[default]
    Permissive,
    /// Only edges of the fulfilment graph are accepted
    Strict,
}

impl TransitionPolicy {
    /// Checks a requested change against the policy.
    ///
    /// # Errors
    /// Returns `Error::InvalidStatusTransition` under `Strict` for an edge
    /// outside the graph.
    pub fn check(self, from: OrderStatus, to: OrderStatus) -> Result<()> {
        match self {
            Self::Permissive => Ok(()),
            Self::Strict if from.can_transition_to(to) => Ok(()),
            Self::Strict => Err(Error::InvalidStatusTransition { from, to }),
        }
    }
}

/// Customer details captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Full name
    pub name: String,
    /// Phone number
    pub phone: String,
    /// Email, if the customer gave one
    pub email: Option<String>,
    /// Street address
    pub address: String,
    /// City
    pub city: String,
    /// Payment method (e.g., "cod")
    pub payment: String,
}

/// Raw checkout form values; email is the only optional field.
#[derive(Debug, Clone, Default)]
pub struct CheckoutForm {
    /// Full name
    pub name: Option<String>,
    /// Phone number
    pub phone: Option<String>,
    /// Email (optional)
    pub email: Option<String>,
    /// Street address
    pub address: Option<String>,
    /// City
    pub city: Option<String>,
    /// Payment method
    pub payment: Option<String>,
}

fn required_text(value: Option<String>, field: &'static str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(Error::MissingField { field })
}

impl CheckoutForm {
    /// Validates the required fields and builds the customer record.
    ///
    /// # Errors
    /// Returns `Error::MissingField` naming the first absent field.
    pub fn into_customer(self) -> Result<Customer> {
        Ok(Customer {
            name: required_text(self.name, "name")?,
            phone: required_text(self.phone, "phone")?,
            email: self.email.filter(|e| !e.trim().is_empty()),
            address: required_text(self.address, "address")?,
            city: required_text(self.city, "city")?,
            payment: required_text(self.payment, "payment")?,
        })
    }
}

/// One entry of an order's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    /// Status the order moved to
    pub status: OrderStatus,
    /// When the change happened
    pub date: DateTime<Utc>,
    /// Free-form admin notes (may be empty)
    #[serde(default)]
    pub notes: String,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order identifier, the same value as `order_number`
    pub id: String,
    /// Who placed the order
    pub customer: Customer,
    /// Frozen copy of the cart at checkout
    pub items: Vec<CartItem>,
    /// Sum of `price × quantity` at checkout, never recomputed
    pub total: f64,
    /// Current fulfilment status
    pub status: OrderStatus,
    /// When the order was placed
    pub date: DateTime<Utc>,
    /// Human-facing order number (`ORD-` plus 8 digits)
    pub order_number: String,
    /// Status changes, created on the first change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_history: Option<Vec<StatusChange>>,
}

/// `ORD-` followed by the last 8 digits of the epoch milliseconds of `now`.
#[must_use]
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().to_string();
    let tail = &millis[millis.len().saturating_sub(8)..];
    format!("ORD-{tail}")
}

impl Order {
    /// Builds a pending order from a cart snapshot.
    ///
    /// The order number is generated once and used for both `id` and
    /// `order_number`.
    #[must_use]
    pub fn place(customer: Customer, items: Vec<CartItem>, now: DateTime<Utc>) -> Self {
        let order_number = generate_order_number(now);
        let total = items.iter().map(CartItem::line_total).sum();
        Self {
            id: order_number.clone(),
            customer,
            items,
            total,
            status: OrderStatus::Pending,
            date: now,
            order_number,
            status_history: None,
        }
    }

    /// Sets `status`, appending a history record when it actually changes.
    ///
    /// Returns whether the status changed.
    pub fn set_status(&mut self, status: OrderStatus, notes: String, now: DateTime<Utc>) -> bool {
        if status == self.status {
            return false;
        }
        self.status = status;
        self.status_history
            .get_or_insert_with(Vec::new)
            .push(StatusChange {
                status,
                date: now,
                notes,
            });
        true
    }
}

/// Result of a status update.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    /// The order after the update
    pub order: Order,
    /// Status before the update
    pub previous: OrderStatus,
    /// Whether anything changed (setting the same status is a no-op)
    pub changed: bool,
}

/// In-memory view of the `orders` key.
#[derive(Debug, Clone)]
pub struct OrderBook {
    db: DatabaseConnection,
    orders: Vec<Order>,
    policy: TransitionPolicy,
}

impl OrderBook {
    /// Loads the order list from storage.
    pub async fn load(db: DatabaseConnection, policy: TransitionPolicy) -> Result<Self> {
        let orders = storage::read_list(&db, StorageKey::Orders).await?;
        Ok(Self { db, orders, policy })
    }

    /// Re-reads the order list, picking up orders written by other contexts.
    pub async fn reload(&mut self) -> Result<()> {
        self.orders = storage::read_list(&self.db, StorageKey::Orders).await?;
        debug!("Reloaded {} orders from storage", self.orders.len());
        Ok(())
    }

    /// Every order, oldest first
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Order with `id`, if present
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    /// Appends `order` and persists the whole list.
    #[instrument(skip(self, order), fields(order_number = %order.order_number))]
    pub async fn append(&mut self, order: Order) -> Result<()> {
        self.reload().await?;
        self.orders.push(order);
        storage::write_list(&self.db, StorageKey::Orders, &self.orders).await?;
        info!("Order appended, {} orders stored", self.orders.len());
        Ok(())
    }

    /// Moves order `id` to `status`, recording `notes` in its history.
    ///
    /// # Errors
    /// Returns `Error::OrderNotFound` for an unknown id and
    /// `Error::InvalidStatusTransition` when the strict policy rejects the edge.
    #[instrument(skip(self, notes))]
    pub async fn update_status(
        &mut self,
        id: &str,
        status: OrderStatus,
        notes: String,
    ) -> Result<StatusUpdate> {
        self.reload().await?;
        let policy = self.policy;
        let order = self
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| Error::OrderNotFound { id: id.to_string() })?;

        let previous = order.status;
        if previous == status {
            return Ok(StatusUpdate {
                order: order.clone(),
                previous,
                changed: false,
            });
        }
        policy.check(previous, status)?;

        order.set_status(status, notes, Utc::now());
        let updated = order.clone();
        storage::write_list(&self.db, StorageKey::Orders, &self.orders).await?;

        info!(
            "Order #{} status updated from \"{}\" to \"{}\"",
            updated.order_number, previous, status
        );
        Ok(StatusUpdate {
            order: updated,
            previous,
            changed: true,
        })
    }
}
