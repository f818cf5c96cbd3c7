//! Product model and catalog helpers shared by the admin and storefront stores.
//!
//! Products are stored and broadcast as whole snapshots, so this module is pure
//! data: the JSON shape, form validation, and the small read-only queries the
//! admin table and the product cards need (search, category filter, discount,
//! stock band).

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Product category.
///
/// The dashboard offers three categories but nothing validates against them,
/// so any other slug round-trips unchanged through [`Category::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    /// `"electronics"`
    Electronics,
    /// `"fashion"`
    Fashion,
    /// `"home"`
    Home,
    /// Any slug outside the known set
    Other(String),
}

impl Category {
    /// The slug stored in JSON
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Electronics => "electronics",
            Self::Fashion => "fashion",
            Self::Home => "home",
            Self::Other(slug) => slug,
        }
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match value.as_str() {
            "electronics" => Self::Electronics,
            "fashion" => Self::Fashion,
            "home" => Self::Home,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        match value {
            Category::Other(slug) => slug,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog product as persisted under `adminProducts` and broadcast in sync messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier, assigned by increment when the admin adds a product
    pub id: i64,
    /// Display name
    pub name: String,
    /// List price before discount
    pub original_price: f64,
    /// Selling price (expected, not enforced, to be at most `original_price`)
    pub price: f64,
    /// Category slug
    pub category: Category,
    /// Long description
    pub description: String,
    /// Image URL (unvalidated)
    pub image: String,
    /// Units in stock
    pub stock: u32,
}

/// Stock band used to colour the admin products table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevel {
    /// Fewer than 10 units
    Low,
    /// Fewer than 30 units
    Medium,
    /// 30 units or more
    Healthy,
}

impl Product {
    /// The product shown when the admin has never saved a catalog.
    #[must_use]
    pub fn default_product() -> Self {
        Self {
            id: 1,
            name: "Test Product - Wireless Headphones".to_string(),
            original_price: 5000.0,
            price: 3500.0,
            category: Category::Electronics,
            description: "This is a test product for demonstration purposes. \
                High-quality wireless headphones with noise cancellation."
                .to_string(),
            image: "https://images.unsplash.com/photo-1505740420928-5e560c06d30e?ixlib=rb-4.0.3&auto=format&fit=crop&w=500&q=80"
                .to_string(),
            stock: 25,
        }
    }

    /// Whole-number discount off the original price, 0 when there is none.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn discount_percentage(&self) -> i64 {
        if self.original_price <= 0.0 || self.original_price <= self.price {
            return 0;
        }
        ((self.original_price - self.price) / self.original_price * 100.0).round() as i64
    }

    /// Stock band for this product
    #[must_use]
    pub const fn stock_level(&self) -> StockLevel {
        match self.stock {
            0..10 => StockLevel::Low,
            10..30 => StockLevel::Medium,
            _ => StockLevel::Healthy,
        }
    }

    /// Case-insensitive match of `term` against the name or description.
    #[must_use]
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.name.to_lowercase().contains(&term) || self.description.to_lowercase().contains(&term)
    }
}

/// Products whose name or description contains `term`, in catalog order.
#[must_use]
pub fn search(products: &[Product], term: &str) -> Vec<Product> {
    products
        .iter()
        .filter(|p| p.matches_search(term))
        .cloned()
        .collect()
}

/// Products in `category`, or every product when no category is selected.
#[must_use]
pub fn filter_by_category(products: &[Product], category: Option<&Category>) -> Vec<Product> {
    products
        .iter()
        .filter(|p| category.is_none_or(|c| &p.category == c))
        .cloned()
        .collect()
}

/// Raw values from the add/edit product form.
///
/// Every field is required; `None` or a blank string means the field was left
/// empty. Only presence is checked, not ranges or formats.
#[derive(Debug, Clone, Default)]
pub struct ProductInput {
    /// Product name
    pub name: Option<String>,
    /// Original price
    pub original_price: Option<f64>,
    /// Current price
    pub price: Option<f64>,
    /// Category slug
    pub category: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Image URL
    pub image: Option<String>,
    /// Stock quantity
    pub stock: Option<u32>,
}

fn required_text(value: Option<String>, field: &'static str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(Error::MissingField { field })
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T> {
    value.ok_or(Error::MissingField { field })
}

impl ProductInput {
    /// Validates presence of every field and builds a product with `id`.
    ///
    /// # Errors
    /// Returns `Error::MissingField` naming the first absent field.
    pub fn into_product(self, id: i64) -> Result<Product> {
        Ok(Product {
            id,
            name: required_text(self.name, "name")?,
            original_price: required(self.original_price, "originalPrice")?,
            price: required(self.price, "price")?,
            category: Category::from(required_text(self.category, "category")?),
            description: required_text(self.description, "description")?,
            image: required_text(self.image, "image")?,
            stock: required(self.stock, "stock")?,
        })
    }
}

impl From<&Product> for ProductInput {
    fn from(product: &Product) -> Self {
        Self {
            name: Some(product.name.clone()),
            original_price: Some(product.original_price),
            price: Some(product.price),
            category: Some(product.category.to_string()),
            description: Some(product.description.clone()),
            image: Some(product.image.clone()),
            stock: Some(product.stock),
        }
    }
}
