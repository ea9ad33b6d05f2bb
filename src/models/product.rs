//! Product and product image models

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::slug::generate_slug;

/// Lowest accepted product price
pub const MIN_PRICE: i64 = 1;
/// Highest accepted product price
pub const MAX_PRICE: i64 = 1_000_000;

/// Product offered in the catalog.
///
/// Every product belongs to one category. A category cannot be deleted while
/// products still reference it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    /// Unique identifier
    pub id: i64,
    pub name: String,
    /// Derived from `name` on every write
    pub slug: String,
    pub description: Option<String>,
    pub price: i64,
    pub stock: i64,
    /// Time of the last write
    pub date: Option<DateTime<Utc>>,
    pub category_id: i64,
    /// Name of the parent category, present on records read from storage
    pub category_name: Option<String>,
}

impl Product {
    /// Create a new product, deriving its slug and stamping the current time
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        price: i64,
        stock: i64,
        category_id: i64,
    ) -> Self {
        let name = name.into();
        Self {
            id: 0, // Will be set by the database
            slug: generate_slug(&name),
            name,
            description,
            price,
            stock,
            date: Some(Utc::now().trunc_subsecs(0)),
            category_id,
            category_name: None,
        }
    }
}

/// Image attached to a product; `name` is the stored file name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductImage {
    pub id: i64,
    pub name: Option<String>,
    pub product_id: i64,
}

impl ProductImage {
    pub fn new(name: impl Into<String>, product_id: i64) -> Self {
        Self {
            id: 0,
            name: Some(name.into()),
            product_id,
        }
    }
}
