//! Storefront - the customer-facing catalog, cart and checkout.
//!
//! The catalog is a shared `Arc<RwLock<Vec<Product>>>`. Reconciliation clears
//! and refills that same vector, so any holder of [`Storefront::catalog_handle`]
//! (a renderer, a test) sees the new snapshot without re-fetching the handle.
//!
//! Snapshots arrive three ways: direct calls from an admin holding a
//! [`StorefrontHandle`](crate::core::sync::StorefrontHandle), `SYNC_PRODUCTS`
//! messages on the window bus, and the polling tick that re-reads
//! `adminProducts`. All three end in [`Storefront::reconcile`], which is a full
//! replace and therefore safe to run any number of times with the same input.

use crate::core::cart::{Cart, CartRepair};
use crate::core::order::{CheckoutForm, Order, OrderBook, TransitionPolicy};
use crate::core::product::Product;
use crate::core::storage::{self, StorageKey};
use crate::core::sync::{self, StorefrontCommand, SyncMessage};
use crate::errors::{Error, Result};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast, mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, trace, warn};

/// Shared, in-place-updated catalog
pub type CatalogHandle = Arc<RwLock<Vec<Product>>>;

/// What a reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Number of products in the catalog afterwards
    pub product_count: usize,
    /// Cart entries dropped or refreshed
    pub cart: CartRepair,
}

/// Storefront state: catalog, cart and the order list it appends to.
#[derive(Debug)]
pub struct Storefront {
    db: DatabaseConnection,
    catalog: CatalogHandle,
    cart: Cart,
    orders: OrderBook,
}

impl Storefront {
    /// Opens the storefront: restores the cart, loads the catalog from storage,
    /// and immediately checks for a newer admin snapshot.
    #[instrument(skip(db))]
    pub async fn open(db: DatabaseConnection, policy: TransitionPolicy) -> Result<Self> {
        let cart = Cart::new(storage::read_list(&db, StorageKey::Cart).await?);
        let orders = OrderBook::load(db.clone(), policy).await?;
        let mut storefront = Self {
            db,
            catalog: Arc::new(RwLock::new(Vec::new())),
            cart,
            orders,
        };
        storefront.load_from_storage().await?;
        storefront.check_for_admin_updates().await?;
        Ok(storefront)
    }

    /// Shared handle to the live catalog
    #[must_use]
    pub fn catalog_handle(&self) -> CatalogHandle {
        Arc::clone(&self.catalog)
    }

    /// Copy of the current catalog
    pub async fn products(&self) -> Vec<Product> {
        self.catalog.read().await.clone()
    }

    /// Product with `id` from the current catalog ("view details")
    pub async fn find_product(&self, id: i64) -> Option<Product> {
        self.catalog.read().await.iter().find(|p| p.id == id).cloned()
    }

    /// The cart
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Orders known to this storefront
    #[must_use]
    pub const fn orders(&self) -> &OrderBook {
        &self.orders
    }

    async fn replace_catalog(&self, products: Vec<Product>) -> usize {
        let mut catalog = self.catalog.write().await;
        catalog.clear();
        catalog.extend(products);
        catalog.len()
    }

    /// Loads the catalog from `adminProducts`, falling back to the default product.
    ///
    /// The result is mirrored into `syncedProducts`. Returns the catalog size.
    pub async fn load_from_storage(&mut self) -> Result<usize> {
        let admin_products: Vec<Product> =
            storage::read_list(&self.db, StorageKey::AdminProducts).await?;

        let products = if admin_products.is_empty() {
            debug!("No admin products in storage, using default product");
            vec![Product::default_product()]
        } else {
            debug!("Loaded {} products from admin storage", admin_products.len());
            admin_products
        };

        storage::write_list(&self.db, StorageKey::SyncedProducts, &products).await?;
        Ok(self.replace_catalog(products).await)
    }

    /// Replaces the catalog with `candidate` and repairs the cart against it.
    ///
    /// Cart entries for vanished products are dropped; the rest take the new
    /// product fields. Running this twice with the same snapshot leaves the
    /// same catalog and cart.
    #[instrument(skip(self, candidate), fields(count = candidate.len()))]
    pub async fn reconcile(&mut self, candidate: Vec<Product>) -> Result<Reconciliation> {
        let product_count = self.replace_catalog(candidate).await;

        let mut repair = CartRepair::default();
        if !self.cart.is_empty() {
            let catalog = self.catalog.read().await;
            repair = self.cart.reconcile_with(&catalog);
            drop(catalog);
            self.persist_cart().await?;
        }

        let catalog = self.catalog.read().await.clone();
        storage::write_list(&self.db, StorageKey::SyncedProducts, &catalog).await?;

        if repair.removed.is_empty() {
            info!("Catalog reconciled to {} products", product_count);
        } else {
            info!(
                "Catalog reconciled to {} products, dropped cart entries {:?}",
                product_count, repair.removed
            );
        }
        Ok(Reconciliation {
            product_count,
            cart: repair,
        })
    }

    /// Polling check: reconciles when `adminProducts` differs from the catalog.
    ///
    /// An empty admin snapshot is ignored. Returns `None` when nothing changed.
    pub async fn check_for_admin_updates(&mut self) -> Result<Option<Reconciliation>> {
        let admin_products: Vec<Product> =
            storage::read_list(&self.db, StorageKey::AdminProducts).await?;
        if admin_products.is_empty() {
            return Ok(None);
        }

        let changed = sync::diverges(&self.catalog.read().await, &admin_products);
        if !changed {
            trace!("Catalog already matches admin snapshot");
            return Ok(None);
        }

        info!("Products updated from admin, syncing...");
        self.reconcile(admin_products).await.map(Some)
    }

    /// Message listener: reconciles on a `SYNC_PRODUCTS` payload, ignores anything else.
    pub async fn handle_message(&mut self, message: &Value) -> Result<Option<Reconciliation>> {
        match SyncMessage::from_value(message) {
            Some(SyncMessage::SyncProducts { products }) => {
                debug!("Received product sync message from admin");
                self.reconcile(products).await.map(Some)
            }
            None => Ok(None),
        }
    }

    /// Direct-call refresh: reload from storage, then re-check for admin updates.
    pub async fn refresh_products(&mut self) -> Result<()> {
        info!("Force refreshing products from storage...");
        self.load_from_storage().await?;
        self.check_for_admin_updates().await?;
        Ok(())
    }

    /// Applies a direct call from the admin.
    pub async fn handle_command(&mut self, command: StorefrontCommand) -> Result<()> {
        match command {
            StorefrontCommand::SyncProducts(products) => {
                self.reconcile(products).await?;
            }
            StorefrontCommand::Refresh => self.refresh_products().await?,
        }
        Ok(())
    }

    async fn persist_cart(&self) -> Result<()> {
        storage::write_list(&self.db, StorageKey::Cart, self.cart.items()).await
    }

    /// Adds one unit of catalog product `product_id` to the cart.
    ///
    /// # Errors
    /// Returns `Error::ProductNotFound` if the product is not in the catalog.
    pub async fn add_to_cart(&mut self, product_id: i64) -> Result<u32> {
        let product = self
            .find_product(product_id)
            .await
            .ok_or(Error::ProductNotFound { id: product_id })?;
        let quantity = self.cart.add(&product);
        self.persist_cart().await?;
        info!("{} added to cart (quantity {})", product.name, quantity);
        Ok(quantity)
    }

    /// Changes a cart entry's quantity, removing it at zero.
    pub async fn update_quantity(&mut self, product_id: i64, change: i64) -> Result<Option<u32>> {
        let quantity = self.cart.update_quantity(product_id, change)?;
        self.persist_cart().await?;
        Ok(quantity)
    }

    /// Removes a cart entry. Returns whether one existed.
    pub async fn remove_from_cart(&mut self, product_id: i64) -> Result<bool> {
        let removed = self.cart.remove(product_id);
        self.persist_cart().await?;
        Ok(removed)
    }

    /// Places an order for the current cart.
    ///
    /// # Errors
    /// Returns `Error::EmptyCart` when there is nothing to buy and
    /// `Error::MissingField` for an incomplete form. On error nothing is written.
    #[instrument(skip(self, form))]
    pub async fn checkout(&mut self, form: CheckoutForm) -> Result<Order> {
        if self.cart.is_empty() {
            return Err(Error::EmptyCart);
        }
        let customer = form.into_customer()?;

        let order = Order::place(customer, self.cart.items().to_vec(), chrono::Utc::now());
        self.orders.append(order.clone()).await?;

        self.cart.clear();
        self.persist_cart().await?;

        info!(
            "Order placed successfully! Order #{} ({} items, total {})",
            order.order_number,
            order.items.len(),
            order.total
        );
        Ok(order)
    }

    /// Runs the sync receiver until `shutdown` fires, then hands the state back.
    ///
    /// Each wake-up handles exactly one trigger: a direct call from `inbox`, a
    /// posted message from `messages`, or a poll tick. Handler errors are
    /// logged and the loop keeps going; a closed inbox or bus just stops being
    /// listened to.
    pub async fn run(
        mut self,
        mut inbox: Option<mpsc::Receiver<StorefrontCommand>>,
        mut messages: Option<broadcast::Receiver<Value>>,
        poll_interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> Self {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Storefront sync receiver started (polling every {:?})", poll_interval);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                command = recv_command(&mut inbox) => match command {
                    Some(command) => {
                        if let Err(e) = self.handle_command(command).await {
                            error!("Direct sync call failed: {}", e);
                        }
                    }
                    None => {
                        debug!("Storefront inbox closed");
                        inbox = None;
                    }
                },
                message = recv_message(&mut messages) => match message {
                    Ok(value) => {
                        if let Err(e) = self.handle_message(&value).await {
                            error!("Sync message handling failed: {}", e);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Skipped {} window messages; polling will catch up", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Window message bus closed");
                        messages = None;
                    }
                },
                _ = ticker.tick() => {
                    if let Err(e) = self.check_for_admin_updates().await {
                        error!("Polling for admin updates failed: {}", e);
                    }
                }
            }
        }

        info!("Storefront sync receiver stopped");
        self
    }
}

async fn recv_command(
    inbox: &mut Option<mpsc::Receiver<StorefrontCommand>>,
) -> Option<StorefrontCommand> {
    match inbox {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn recv_message(
    messages: &mut Option<broadcast::Receiver<Value>>,
) -> std::result::Result<Value, broadcast::error::RecvError> {
    match messages {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
