//! Dashboard summary for the admin overview page.
//!
//! Pure functions over the order list and catalog size; the admin store feeds
//! them whatever it last read from storage.

use crate::core::order::{Order, OrderStatus};

/// Number of orders shown in the "recent orders" panel
pub const RECENT_ORDER_LIMIT: usize = 3;

/// Headline numbers and the latest orders.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    /// Orders placed so far
    pub total_orders: usize,
    /// Orders still in `pending`
    pub pending_orders: usize,
    /// Products in the admin catalog
    pub total_products: usize,
    /// Up to [`RECENT_ORDER_LIMIT`] orders, newest first
    pub recent_orders: Vec<Order>,
}

/// Builds the summary from the stored order list (oldest first).
#[must_use]
pub fn generate_summary(orders: &[Order], total_products: usize) -> DashboardSummary {
    DashboardSummary {
        total_orders: orders.len(),
        pending_orders: orders
            .iter()
            .filter(|o| o.status == OrderStatus::Pending)
            .count(),
        total_products,
        recent_orders: orders.iter().rev().take(RECENT_ORDER_LIMIT).cloned().collect(),
    }
}
