//! Shared test utilities for the storefront and admin stores.
//!
//! This module provides common helpers for setting up test databases and
//! building products, forms and orders with sensible defaults.

use crate::{
    core::{
        cart::CartItem,
        order::{CheckoutForm, Customer, Order},
        product::{Product, ProductInput},
    },
    errors::Result,
};
use sea_orm::DatabaseConnection;
use tracing_subscriber::EnvFilter;

/// Installs a test-writer subscriber once; later calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with the storage table initialized.
/// This is the standard setup for all store tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Builds a complete product form.
///
/// # Defaults
/// * `original_price`: `price` plus 20%
/// * `description`: `"<name> description"`
/// * `image`: `"https://example.com/<name>.png"`
/// * `stock`: 10
#[must_use]
pub fn product_input(name: &str, price: f64, category: &str) -> ProductInput {
    ProductInput {
        name: Some(name.to_string()),
        original_price: Some(price * 1.2),
        price: Some(price),
        category: Some(category.to_string()),
        description: Some(format!("{name} description")),
        image: Some(format!("https://example.com/{name}.png")),
        stock: Some(10),
    }
}

/// Three products with ids 1..=3 across the known categories.
#[must_use]
pub fn sample_catalog() -> Vec<Product> {
    let mut catalog = vec![Product::default_product()];
    catalog.extend(
        [("Linen Shirt", 2000.0, "fashion"), ("Desk Lamp", 1500.0, "home")]
            .into_iter()
            .zip(2_i64..)
            .filter_map(|((name, price, category), id)| {
                product_input(name, price, category).into_product(id).ok()
            }),
    );
    catalog
}

/// A complete checkout form without an email address.
#[must_use]
pub fn checkout_form() -> CheckoutForm {
    CheckoutForm {
        name: Some("Ayesha Khan".to_string()),
        phone: Some("0300-1234567".to_string()),
        email: None,
        address: Some("12 Canal Road".to_string()),
        city: Some("Lahore".to_string()),
        payment: Some("cod".to_string()),
    }
}

/// A pending order for a single cart line whose total equals `total`.
#[must_use]
pub fn test_order(total: f64) -> Order {
    let mut product = Product::default_product();
    product.price = total;
    let customer = Customer {
        name: "Test Customer".to_string(),
        phone: "0300-0000000".to_string(),
        email: Some("customer@example.com".to_string()),
        address: "1 Test Street".to_string(),
        city: "Karachi".to_string(),
        payment: "cod".to_string(),
    };
    Order::place(
        customer,
        vec![CartItem {
            product,
            quantity: 1,
        }],
        chrono::Utc::now(),
    )
}
