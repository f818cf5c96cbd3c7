//! Unified error type for the storefront and admin stores.

use crate::core::order::OrderStatus;
use thiserror::Error;

/// Every failure a store operation can report.
///
/// Storage reads never produce an error for bad content (they fall back to an
/// empty list), so most variants come from mutations rejecting their input.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of what went wrong
        message: String,
    },

    /// A form was submitted without one of its required fields
    #[error("Missing required field: {field}")]
    MissingField {
        /// Name of the missing field as it appears on the form
        field: &'static str,
    },

    /// No product with this id exists in the admin catalog
    #[error("Product not found: {id}")]
    ProductNotFound {
        /// The product id that was looked up
        id: i64,
    },

    /// No order with this id exists in the order list
    #[error("Order not found: {id}")]
    OrderNotFound {
        /// The order id that was looked up
        id: String,
    },

    /// The cart has no entry for this product
    #[error("Cart item not found: {id}")]
    CartItemNotFound {
        /// The product id of the missing cart entry
        id: i64,
    },

    /// A quantity change would leave a cart entry above the largest storable quantity
    #[error("Quantity {requested} for cart item {id} is out of range")]
    QuantityOutOfRange {
        /// The product id of the cart entry
        id: i64,
        /// The quantity the change would have produced
        requested: i64,
    },

    /// Checkout was attempted with nothing in the cart
    #[error("Your cart is empty")]
    EmptyCart,

    /// The strict transition policy rejected a status change
    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        /// Status the order currently has
        from: OrderStatus,
        /// Status that was requested
        to: OrderStatus,
    },

    /// Underlying key/value table failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A value could not be serialized for storage
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O failure (config file, data directory)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
