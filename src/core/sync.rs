//! Cross-context product sync - the snapshot protocol between admin and storefront.
//!
//! The admin never sends deltas. After every mutation it writes the full
//! product list to `adminProducts` and then tries each delivery path in turn:
//!
//! 1. the opener's direct sync entry point ([`StorefrontHandle::sync_products_from_admin`])
//! 2. a `SYNC_PRODUCTS` message posted to the parent window bus
//! 3. the same message posted to its own window bus
//! 4. the opener's refresh callback ([`StorefrontHandle::refresh_products`])
//!
//! Paths are independent and unacknowledged: one failing never stops the
//! others, and nothing is retried. The storefront's polling loop is what
//! eventually catches a snapshot that no path delivered.

use crate::core::product::Product;
use crate::core::storage::{self, StorageKey};
use crate::errors::Result;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, instrument, warn};

/// Message type tag of a product sync message
pub const SYNC_PRODUCTS: &str = "SYNC_PRODUCTS";

/// Capacity of a window message bus before slow listeners start lagging
pub const WINDOW_BUS_CAPACITY: usize = 64;

/// Structured messages exchanged over window buses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncMessage {
    /// `{ "type": "SYNC_PRODUCTS", "products": [...] }`
    #[serde(rename = "SYNC_PRODUCTS")]
    SyncProducts {
        /// The full admin snapshot
        products: Vec<Product>,
    },
}

impl SyncMessage {
    /// Picks a sync message out of an arbitrary posted payload.
    ///
    /// Payloads without `type == "SYNC_PRODUCTS"` are not ours and yield
    /// `None` silently; a correctly tagged payload with a malformed product
    /// list is logged and also ignored.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        if value.get("type").and_then(Value::as_str) != Some(SYNC_PRODUCTS) {
            return None;
        }
        match Self::deserialize(value) {
            Ok(message) => Some(message),
            Err(e) => {
                warn!("Ignoring malformed {} message: {}", SYNC_PRODUCTS, e);
                None
            }
        }
    }
}

/// A window's message bus. Anything may be posted; listeners filter by type.
pub type WindowBus = broadcast::Sender<Value>;

/// Creates a window message bus and its first listener.
#[must_use]
pub fn window_bus() -> (WindowBus, broadcast::Receiver<Value>) {
    broadcast::channel(WINDOW_BUS_CAPACITY)
}

/// Direct calls the admin can make on a storefront it holds a handle to.
#[derive(Debug)]
pub enum StorefrontCommand {
    /// Replace the catalog with this snapshot
    SyncProducts(Vec<Product>),
    /// Re-read storage and re-check for admin updates
    Refresh,
}

/// Handle to a running storefront, the equivalent of an opener window reference.
#[derive(Debug, Clone)]
pub struct StorefrontHandle {
    sender: mpsc::Sender<StorefrontCommand>,
}

impl StorefrontHandle {
    /// Creates a handle and the inbox the storefront task reads from.
    #[must_use]
    pub fn channel(buffer_size: usize) -> (Self, mpsc::Receiver<StorefrontCommand>) {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        (Self { sender }, receiver)
    }

    /// Hands a full snapshot to the storefront without waiting for it to apply.
    #[must_use]
    pub fn sync_products_from_admin(&self, products: Vec<Product>) -> DeliveryOutcome {
        self.send(StorefrontCommand::SyncProducts(products))
    }

    /// Asks the storefront to reload from storage.
    #[must_use]
    pub fn refresh_products(&self) -> DeliveryOutcome {
        self.send(StorefrontCommand::Refresh)
    }

    fn send(&self, command: StorefrontCommand) -> DeliveryOutcome {
        match self.sender.try_send(command) {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(mpsc::error::TrySendError::Closed(_)) => DeliveryOutcome::Unavailable,
            Err(mpsc::error::TrySendError::Full(_)) => {
                DeliveryOutcome::Failed("storefront inbox is full".to_string())
            }
        }
    }
}

/// The delivery paths tried by a broadcast, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Direct sync call on the opener
    Opener,
    /// Message posted to the parent window
    Parent,
    /// Message posted to the admin's own window
    SelfWindow,
    /// Refresh callback on the opener
    OpenerRefresh,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Opener => "opener",
            Self::Parent => "parent",
            Self::SelfWindow => "self",
            Self::OpenerRefresh => "opener-refresh",
        })
    }
}

/// What happened on one delivery path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Handed to the counterpart (not necessarily applied yet)
    Delivered,
    /// No counterpart was listening on this path
    Unavailable,
    /// The counterpart exists but delivery failed
    Failed(String),
}

/// Per-channel outcomes of one broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Outcomes in the order the paths were tried
    pub outcomes: Vec<(Channel, DeliveryOutcome)>,
}

impl BroadcastReport {
    /// Outcome recorded for `channel`
    #[must_use]
    pub fn outcome(&self, channel: Channel) -> Option<&DeliveryOutcome> {
        self.outcomes
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|(_, outcome)| outcome)
    }

    /// Number of paths that delivered
    #[must_use]
    pub fn delivered_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == DeliveryOutcome::Delivered)
            .count()
    }

    /// Whether at least one path delivered
    #[must_use]
    pub fn any_delivered(&self) -> bool {
        self.delivered_count() > 0
    }
}

/// The admin side of the protocol: where snapshots can be delivered.
#[derive(Debug, Clone, Default)]
pub struct Broadcaster {
    opener: Option<StorefrontHandle>,
    parent: Option<WindowBus>,
    window: Option<WindowBus>,
}

impl Broadcaster {
    /// A broadcaster with no live paths; snapshots only reach storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a direct handle to the storefront that opened the admin.
    #[must_use]
    pub fn with_opener(mut self, opener: StorefrontHandle) -> Self {
        self.opener = Some(opener);
        self
    }

    /// Adds the parent window's message bus.
    #[must_use]
    pub fn with_parent(mut self, parent: WindowBus) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Adds the admin's own window message bus.
    #[must_use]
    pub fn with_window(mut self, window: WindowBus) -> Self {
        self.window = Some(window);
        self
    }

    /// Writes the full snapshot to `adminProducts`, then publishes it.
    ///
    /// # Errors
    /// Only the storage write can fail; delivery problems are reported in the
    /// returned [`BroadcastReport`].
    #[instrument(skip(self, db, products), fields(count = products.len()))]
    pub async fn sync(
        &self,
        db: &DatabaseConnection,
        products: &[Product],
    ) -> Result<BroadcastReport> {
        storage::write_list(db, StorageKey::AdminProducts, products).await?;
        let report = self.publish(products);
        info!(
            "Synced {} products ({} of {} paths delivered)",
            products.len(),
            report.delivered_count(),
            report.outcomes.len()
        );
        Ok(report)
    }

    /// Tries every delivery path once, independently.
    #[must_use]
    pub fn publish(&self, products: &[Product]) -> BroadcastReport {
        let message = serde_json::to_value(SyncMessage::SyncProducts {
            products: products.to_vec(),
        })
        .map_err(|e| e.to_string());

        let mut report = BroadcastReport::default();
        let mut record = |channel: Channel, outcome: DeliveryOutcome| {
            match &outcome {
                DeliveryOutcome::Delivered => debug!("Products synced via {}", channel),
                DeliveryOutcome::Unavailable => debug!("Sync path {} unavailable", channel),
                DeliveryOutcome::Failed(reason) => {
                    error!("Could not sync via {}: {}", channel, reason);
                }
            }
            report.outcomes.push((channel, outcome));
        };

        record(
            Channel::Opener,
            self.opener.as_ref().map_or(DeliveryOutcome::Unavailable, |h| {
                h.sync_products_from_admin(products.to_vec())
            }),
        );
        record(Channel::Parent, post(self.parent.as_ref(), &message));
        record(Channel::SelfWindow, post(self.window.as_ref(), &message));
        record(
            Channel::OpenerRefresh,
            self.opener
                .as_ref()
                .map_or(DeliveryOutcome::Unavailable, StorefrontHandle::refresh_products),
        );

        report
    }
}

fn post(bus: Option<&WindowBus>, message: &std::result::Result<Value, String>) -> DeliveryOutcome {
    let Some(bus) = bus else {
        return DeliveryOutcome::Unavailable;
    };
    match message {
        Ok(value) => match bus.send(value.clone()) {
            Ok(_) => DeliveryOutcome::Delivered,
            Err(_) => DeliveryOutcome::Unavailable,
        },
        Err(reason) => DeliveryOutcome::Failed(reason.clone()),
    }
}

/// Whether `candidate` differs from `current`.
///
/// Compares the id sequences first, then the full serialized form. A snapshot
/// that cannot be serialized counts as diverged.
#[must_use]
pub fn diverges(current: &[Product], candidate: &[Product]) -> bool {
    if !current.iter().map(|p| p.id).eq(candidate.iter().map(|p| p.id)) {
        return true;
    }
    match (serde_json::to_string(current), serde_json::to_string(candidate)) {
        (Ok(a), Ok(b)) => a != b,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use serde_json::json;

    #[test]
    fn test_message_wire_shape() {
        let message = SyncMessage::SyncProducts {
            products: vec![Product::default_product()],
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "SYNC_PRODUCTS");
        assert_eq!(value["products"][0]["id"], 1);
    }

    #[test]
    fn test_from_value_filters_foreign_messages() {
        assert!(SyncMessage::from_value(&json!({"type": "OTHER"})).is_none());
        assert!(SyncMessage::from_value(&json!("hello")).is_none());
        assert!(SyncMessage::from_value(&json!({"type": "SYNC_PRODUCTS", "products": 3})).is_none());

        let value = json!({"type": "SYNC_PRODUCTS", "products": []});
        assert_eq!(
            SyncMessage::from_value(&value),
            Some(SyncMessage::SyncProducts { products: vec![] })
        );
    }

    #[test]
    fn test_publish_without_paths_reports_all_unavailable() {
        let report = Broadcaster::new().publish(&sample_catalog());
        assert_eq!(report.outcomes.len(), 4);
        assert!(!report.any_delivered());
        assert_eq!(
            report.outcome(Channel::Opener),
            Some(&DeliveryOutcome::Unavailable)
        );
    }

    #[tokio::test]
    async fn test_publish_delivers_on_every_live_path() {
        let (handle, mut inbox) = StorefrontHandle::channel(8);
        let (parent, mut parent_rx) = window_bus();
        let (window, mut window_rx) = window_bus();
        let broadcaster = Broadcaster::new()
            .with_opener(handle)
            .with_parent(parent)
            .with_window(window);

        let catalog = sample_catalog();
        let report = broadcaster.publish(&catalog);
        assert_eq!(report.delivered_count(), 4);

        match inbox.recv().await.unwrap() {
            StorefrontCommand::SyncProducts(products) => assert_eq!(products, catalog),
            StorefrontCommand::Refresh => panic!("sync call should arrive first"),
        }
        assert!(matches!(inbox.recv().await.unwrap(), StorefrontCommand::Refresh));

        for rx in [&mut parent_rx, &mut window_rx] {
            let value = rx.recv().await.unwrap();
            assert_eq!(
                SyncMessage::from_value(&value),
                Some(SyncMessage::SyncProducts {
                    products: catalog.clone()
                })
            );
        }
    }

    #[test]
    fn test_one_failing_path_does_not_block_others() {
        let (handle, inbox) = StorefrontHandle::channel(1);
        drop(inbox);
        let (window, _window_rx) = window_bus();
        let broadcaster = Broadcaster::new().with_opener(handle).with_window(window);

        let report = broadcaster.publish(&sample_catalog());
        assert_eq!(
            report.outcome(Channel::Opener),
            Some(&DeliveryOutcome::Unavailable)
        );
        assert_eq!(
            report.outcome(Channel::SelfWindow),
            Some(&DeliveryOutcome::Delivered)
        );
        assert_eq!(report.delivered_count(), 1);
    }

    #[test]
    fn test_full_inbox_is_reported_as_failure() {
        let (handle, _inbox) = StorefrontHandle::channel(1);
        let broadcaster = Broadcaster::new().with_opener(handle);

        let report = broadcaster.publish(&sample_catalog());
        assert_eq!(
            report.outcome(Channel::Opener),
            Some(&DeliveryOutcome::Delivered)
        );
        assert!(matches!(
            report.outcome(Channel::OpenerRefresh),
            Some(DeliveryOutcome::Failed(_))
        ));
    }

    #[tokio::test]
    async fn test_sync_writes_snapshot_before_publishing() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = sample_catalog();

        let report = Broadcaster::new().sync(&db, &catalog).await?;
        assert!(!report.any_delivered());

        let stored: Vec<Product> = storage::read_list(&db, StorageKey::AdminProducts).await?;
        assert_eq!(stored, catalog);
        Ok(())
    }

    #[test]
    fn test_diverges() {
        let catalog = sample_catalog();
        assert!(!diverges(&catalog, &catalog.clone()));

        let mut reordered = catalog.clone();
        reordered.reverse();
        assert!(diverges(&catalog, &reordered));

        let mut repriced = catalog.clone();
        repriced[0].price += 1.0;
        assert!(diverges(&catalog, &repriced));

        assert!(diverges(&catalog, &[]));
    }
}
