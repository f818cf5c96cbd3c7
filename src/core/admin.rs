//! Admin store - the authoritative, editable product list and order management.
//!
//! Every product mutation follows the same sequence: change the in-memory
//! list, write the whole list to `adminProducts`, then broadcast it through
//! the [`Broadcaster`]. Only required-field presence is validated.

use crate::core::dashboard::{self, DashboardSummary};
use crate::core::order::{OrderBook, OrderStatus, StatusUpdate, TransitionPolicy};
use crate::core::product::{self, Category, Product, ProductInput};
use crate::core::storage::{self, StorageKey};
use crate::core::sync::{BroadcastReport, Broadcaster};
use crate::errors::{Error, Result};
use sea_orm::DatabaseConnection;
use tracing::{info, instrument};

/// A product mutation and how its snapshot was delivered.
#[derive(Debug, Clone)]
pub struct ProductChange {
    /// The added, updated or deleted product
    pub product: Product,
    /// Outcome of the broadcast that followed the write
    pub report: BroadcastReport,
}

/// Admin dashboard state.
#[derive(Debug)]
pub struct AdminStore {
    db: DatabaseConnection,
    products: Vec<Product>,
    broadcaster: Broadcaster,
    orders: OrderBook,
}

impl AdminStore {
    /// Opens the admin store.
    ///
    /// Uses the stored `adminProducts` snapshot if there is one, otherwise
    /// `seed`, and writes the result back so the storefront can find it. No
    /// broadcast is made; call [`AdminStore::force_sync`] for the initial sync.
    #[instrument(skip(db, seed, broadcaster))]
    pub async fn open(
        db: DatabaseConnection,
        seed: Vec<Product>,
        broadcaster: Broadcaster,
        policy: TransitionPolicy,
    ) -> Result<Self> {
        let stored: Vec<Product> = storage::read_list(&db, StorageKey::AdminProducts).await?;
        let products = if stored.is_empty() {
            info!("Seeding admin catalog with {} products", seed.len());
            seed
        } else {
            stored
        };
        storage::write_list(&db, StorageKey::AdminProducts, &products).await?;

        let orders = OrderBook::load(db.clone(), policy).await?;
        Ok(Self {
            db,
            products,
            broadcaster,
            orders,
        })
    }

    /// The admin catalog in display order
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Product with `id`, if present
    #[must_use]
    pub fn find_product(&self, id: i64) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Products matching the table's search box
    #[must_use]
    pub fn search(&self, term: &str) -> Vec<Product> {
        product::search(&self.products, term)
    }

    /// Products matching the table's category filter
    #[must_use]
    pub fn filter_by_category(&self, category: Option<&Category>) -> Vec<Product> {
        product::filter_by_category(&self.products, category)
    }

    /// Id the next added product will get: one more than the highest id in use.
    #[must_use]
    pub fn next_id(&self) -> i64 {
        self.products.iter().map(|p| p.id).max().unwrap_or(0) + 1
    }

    /// Validates and appends a new product, then syncs.
    ///
    /// # Errors
    /// Returns `Error::MissingField` for an incomplete form, or a storage error.
    #[instrument(skip(self, input))]
    pub async fn add_product(&mut self, input: ProductInput) -> Result<ProductChange> {
        let product = input.into_product(self.next_id())?;
        self.products.push(product.clone());
        let report = self.force_sync().await?;
        info!("Product '{}' (ID: {}) added", product.name, product.id);
        Ok(ProductChange { product, report })
    }

    /// Replaces every editable field of product `id`, then syncs.
    ///
    /// # Errors
    /// Returns `Error::ProductNotFound` for an unknown id and
    /// `Error::MissingField` for an incomplete form.
    #[instrument(skip(self, input))]
    pub async fn update_product(&mut self, id: i64, input: ProductInput) -> Result<ProductChange> {
        let index = self
            .products
            .iter()
            .position(|p| p.id == id)
            .ok_or(Error::ProductNotFound { id })?;
        let product = input.into_product(id)?;
        self.products[index] = product.clone();
        let report = self.force_sync().await?;
        info!("Product '{}' (ID: {}) updated", product.name, product.id);
        Ok(ProductChange { product, report })
    }

    /// Removes product `id`, then syncs.
    ///
    /// # Errors
    /// Returns `Error::ProductNotFound` for an unknown id.
    #[instrument(skip(self))]
    pub async fn delete_product(&mut self, id: i64) -> Result<ProductChange> {
        let index = self
            .products
            .iter()
            .position(|p| p.id == id)
            .ok_or(Error::ProductNotFound { id })?;
        let product = self.products.remove(index);
        let report = self.force_sync().await?;
        info!("Product '{}' (ID: {}) deleted", product.name, product.id);
        Ok(ProductChange { product, report })
    }

    /// Writes the current catalog to storage and broadcasts it, without changes.
    pub async fn force_sync(&self) -> Result<BroadcastReport> {
        self.broadcaster.sync(&self.db, &self.products).await
    }

    /// Orders as last read from storage
    #[must_use]
    pub const fn orders(&self) -> &OrderBook {
        &self.orders
    }

    /// Moves order `id` to `status` under the configured transition policy.
    pub async fn update_order_status(
        &mut self,
        id: &str,
        status: OrderStatus,
        notes: String,
    ) -> Result<StatusUpdate> {
        self.orders.update_status(id, status, notes).await
    }

    /// Overview numbers for the dashboard page.
    ///
    /// Orders are re-read from storage first so storefront checkouts show up.
    pub async fn dashboard(&mut self) -> Result<DashboardSummary> {
        self.orders.reload().await?;
        Ok(dashboard::generate_summary(
            self.orders.orders(),
            self.products.len(),
        ))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::storefront::Storefront;
    use crate::core::sync::{Channel, DeliveryOutcome, StorefrontHandle, window_bus};
    use crate::test_utils::*;

    async fn open_admin(db: &DatabaseConnection, broadcaster: Broadcaster) -> Result<AdminStore> {
        AdminStore::open(
            db.clone(),
            vec![Product::default_product()],
            broadcaster,
            TransitionPolicy::Permissive,
        )
        .await
    }

    #[tokio::test]
    async fn test_open_seeds_empty_storage() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = open_admin(&db, Broadcaster::new()).await?;

        assert_eq!(admin.products(), &[Product::default_product()]);
        let stored: Vec<Product> = storage::read_list(&db, StorageKey::AdminProducts).await?;
        assert_eq!(stored, vec![Product::default_product()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_open_keeps_stored_catalog() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = sample_catalog();
        storage::write_list(&db, StorageKey::AdminProducts, &catalog).await?;

        let admin = open_admin(&db, Broadcaster::new()).await?;
        assert_eq!(admin.products(), catalog.as_slice());
        Ok(())
    }

    #[tokio::test]
    async fn test_add_product_persists_full_list() -> Result<()> {
        let db = setup_test_db().await?;
        let mut admin = open_admin(&db, Broadcaster::new()).await?;

        let change = admin
            .add_product(product_input("X", 100.0, "fashion"))
            .await?;
        assert_eq!(change.product.id, 2);
        assert_eq!(change.product.price, 100.0);

        let stored: Vec<Product> = storage::read_list(&db, StorageKey::AdminProducts).await?;
        assert_eq!(stored, admin.products());
        assert_eq!(stored.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_after_delete_does_not_reuse_ids() -> Result<()> {
        let db = setup_test_db().await?;
        let mut admin = open_admin(&db, Broadcaster::new()).await?;
        admin.add_product(product_input("A", 1.0, "home")).await?;
        admin.add_product(product_input("B", 2.0, "home")).await?;
        admin.delete_product(2).await?;

        let change = admin.add_product(product_input("C", 3.0, "home")).await?;
        assert_eq!(change.product.id, 4);
        let ids: Vec<i64> = admin.products().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_product_rejects_missing_field() -> Result<()> {
        let db = setup_test_db().await?;
        let mut admin = open_admin(&db, Broadcaster::new()).await?;
        let mut input = product_input("X", 100.0, "fashion");
        input.name = None;

        let result = admin.add_product(input).await;
        assert!(matches!(result, Err(Error::MissingField { field: "name" })));
        assert_eq!(admin.products().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_product_keeps_id() -> Result<()> {
        let db = setup_test_db().await?;
        let mut admin = open_admin(&db, Broadcaster::new()).await?;
        let mut input = ProductInput::from(&Product::default_product());
        input.price = Some(3000.0);

        let change = admin.update_product(1, input).await?;
        assert_eq!(change.product.id, 1);
        assert_eq!(admin.find_product(1).unwrap().price, 3000.0);

        let missing = admin
            .update_product(9, product_input("Y", 1.0, "home"))
            .await;
        assert!(matches!(missing, Err(Error::ProductNotFound { id: 9 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_unknown_product() -> Result<()> {
        let db = setup_test_db().await?;
        let mut admin = open_admin(&db, Broadcaster::new()).await?;
        let result = admin.delete_product(5).await;
        assert!(matches!(result, Err(Error::ProductNotFound { id: 5 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_mutation_reports_delivery_per_channel() -> Result<()> {
        let db = setup_test_db().await?;
        let (handle, mut inbox) = StorefrontHandle::channel(8);
        let (window, _window_rx) = window_bus();
        let broadcaster = Broadcaster::new().with_opener(handle).with_window(window);
        let mut admin = open_admin(&db, broadcaster).await?;

        let change = admin.delete_product(1).await?;
        assert_eq!(
            change.report.outcome(Channel::Opener),
            Some(&DeliveryOutcome::Delivered)
        );
        assert_eq!(
            change.report.outcome(Channel::Parent),
            Some(&DeliveryOutcome::Unavailable)
        );
        assert!(inbox.recv().await.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_admin_add_reaches_storefront_as_full_list() -> Result<()> {
        let db = setup_test_db().await?;
        let mut admin = open_admin(&db, Broadcaster::new()).await?;
        let mut storefront = Storefront::open(db.clone(), TransitionPolicy::Permissive).await?;

        admin.add_product(product_input("X", 100.0, "fashion")).await?;
        storefront.check_for_admin_updates().await?;

        let products = storefront.products().await;
        assert_eq!(products, admin.products());
        let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(products[1].name, "X");
        Ok(())
    }

    #[tokio::test]
    async fn test_admin_delete_empties_cart_after_sync() -> Result<()> {
        let db = setup_test_db().await?;
        let mut admin = open_admin(&db, Broadcaster::new()).await?;
        admin.add_product(product_input("X", 100.0, "fashion")).await?;
        let mut storefront = Storefront::open(db.clone(), TransitionPolicy::Permissive).await?;
        storefront.add_to_cart(1).await?;
        storefront.add_to_cart(1).await?;

        admin.delete_product(1).await?;
        storefront.check_for_admin_updates().await?;

        assert!(storefront.cart().is_empty());
        assert_eq!(storage::get_item(&db, StorageKey::Cart).await?.as_deref(), Some("[]"));
        Ok(())
    }

    #[tokio::test]
    async fn test_order_status_and_dashboard() -> Result<()> {
        let db = setup_test_db().await?;
        let mut admin = open_admin(&db, Broadcaster::new()).await?;
        let mut storefront = Storefront::open(db.clone(), TransitionPolicy::Permissive).await?;
        storefront.add_to_cart(1).await?;
        let order = storefront.checkout(checkout_form()).await?;

        let summary = admin.dashboard().await?;
        assert_eq!(summary.total_orders, 1);
        assert_eq!(summary.pending_orders, 1);
        assert_eq!(summary.total_products, 1);

        let update = admin
            .update_order_status(&order.id, OrderStatus::Processing, String::new())
            .await?;
        assert!(update.changed);
        assert_eq!(admin.dashboard().await?.pending_orders, 0);

        storefront.add_to_cart(1).await?;
        storefront.checkout(checkout_form()).await?;
        let summary = admin.dashboard().await?;
        assert_eq!(summary.total_orders, 2);
        assert_eq!(summary.pending_orders, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_search_and_category_filter() -> Result<()> {
        let db = setup_test_db().await?;
        let mut admin = open_admin(&db, Broadcaster::new()).await?;
        admin.add_product(product_input("Linen Shirt", 10.0, "fashion")).await?;

        assert_eq!(admin.search("shirt").len(), 1);
        assert_eq!(admin.filter_by_category(Some(&Category::Electronics)).len(), 1);
        assert_eq!(admin.filter_by_category(None).len(), 2);
        Ok(())
    }
}
