//! Core business logic - framework-agnostic catalog, cart, order and sync operations.

/// Admin product management, order management and dashboard access
pub mod admin;
/// Shopping cart state
pub mod cart;
/// Admin dashboard summary
pub mod dashboard;
/// Orders, checkout forms and the status workflow
pub mod order;
/// Product model and catalog queries
pub mod product;
/// Key/value "local storage" access
pub mod storage;
/// Customer-facing catalog, cart and checkout with the sync receiver
pub mod storefront;
/// Snapshot broadcast protocol between admin and storefront
pub mod sync;
