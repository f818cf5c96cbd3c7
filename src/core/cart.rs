//! Shopping cart - product snapshots with quantities.
//!
//! Cart entries are "live" snapshots: reconciliation overwrites their product
//! fields with the latest catalog data and drops entries whose product was
//! deleted. Persistence is the storefront's job; this type only holds state.

use crate::core::product::Product;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};

/// One cart line: the product fields flattened alongside a quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product snapshot, refreshed on every reconciliation
    #[serde(flatten)]
    pub product: Product,
    /// Number of units, always at least 1 while the entry exists
    pub quantity: u32,
}

impl CartItem {
    /// `price × quantity`
    #[must_use]
    pub fn line_total(&self) -> f64 {
        self.product.price * f64::from(self.quantity)
    }
}

/// What [`Cart::reconcile_with`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartRepair {
    /// Product ids whose entries were dropped because the product is gone
    pub removed: Vec<i64>,
    /// Number of entries refreshed from the catalog
    pub refreshed: usize,
}

/// The storefront cart, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Wraps previously persisted entries.
    #[must_use]
    pub const fn new(items: Vec<CartItem>) -> Self {
        Self { items }
    }

    /// Current entries
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Whether the cart has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Entry for `product_id`, if present
    #[must_use]
    pub fn get(&self, product_id: i64) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product.id == product_id)
    }

    /// Adds one unit of `product`, merging into an existing entry with the same id.
    ///
    /// Returns the entry's new quantity.
    pub fn add(&mut self, product: &Product) -> u32 {
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|item| item.product.id == product.id)
        {
            existing.quantity = existing.quantity.saturating_add(1);
            return existing.quantity;
        }
        self.items.push(CartItem {
            product: product.clone(),
            quantity: 1,
        });
        1
    }

    /// Changes an entry's quantity by `change`, removing it when it drops to zero or below.
    ///
    /// Returns the new quantity, or `None` if the entry was removed.
    ///
    /// # Errors
    /// Returns `Error::CartItemNotFound` if no entry has `product_id`, or
    /// `Error::QuantityOutOfRange` if the new quantity does not fit in a `u32`.
    /// The entry is left unchanged on error.
    pub fn update_quantity(&mut self, product_id: i64, change: i64) -> Result<Option<u32>> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.product.id == product_id)
            .ok_or(Error::CartItemNotFound { id: product_id })?;

        let new_quantity = i64::from(item.quantity).saturating_add(change);
        if new_quantity <= 0 {
            self.remove(product_id);
            return Ok(None);
        }

        let quantity = u32::try_from(new_quantity).map_err(|_| Error::QuantityOutOfRange {
            id: product_id,
            requested: new_quantity,
        })?;
        item.quantity = quantity;
        Ok(Some(quantity))
    }

    /// Removes the entry for `product_id`. Returns whether one was removed.
    pub fn remove(&mut self, product_id: i64) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.product.id != product_id);
        self.items.len() != before
    }

    /// Removes every entry, returning them.
    pub fn clear(&mut self) -> Vec<CartItem> {
        std::mem::take(&mut self.items)
    }

    /// Total units across all entries
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Sum of `price × quantity` over all entries
    #[must_use]
    pub fn total(&self) -> f64 {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Aligns the cart with a new catalog.
    ///
    /// Entries whose product id is absent from `catalog` are dropped; the rest
    /// take the catalog's current product fields while keeping their quantity.
    pub fn reconcile_with(&mut self, catalog: &[Product]) -> CartRepair {
        let mut repair = CartRepair::default();
        self.items.retain_mut(|item| {
            match catalog.iter().find(|p| p.id == item.product.id) {
                Some(product) => {
                    item.product.clone_from(product);
                    repair.refreshed += 1;
                    true
                }
                None => {
                    repair.removed.push(item.product.id);
                    false
                }
            }
        });
        repair
    }
}
