//! Storage shape of the catalog: categories, products and product images

use anyhow::Result;

use super::entity::{Entity, RowReader, SqlValue};
use crate::models::{Category, Product, ProductImage};

impl Entity for Category {
    const TABLE: &'static str = "categories";
    const SELECT: &'static str = "SELECT t.id, t.name FROM categories t";
    const COLUMNS: &'static [&'static str] = &["name"];

    fn id(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![SqlValue::Text(self.name.clone())]
    }

    fn from_row(row: &dyn RowReader) -> Result<Self> {
        Ok(Self {
            id: row.int("id")?,
            name: row.text("name")?,
        })
    }
}

impl Entity for Product {
    const TABLE: &'static str = "products";
    const SELECT: &'static str = r#"
        SELECT t.id, t.name, t.slug, t.description, t.price, t.stock, t.date,
               t.category_id, c.name AS category_name
        FROM products t
        LEFT JOIN categories c ON c.id = t.category_id"#;
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "slug",
        "description",
        "price",
        "stock",
        "date",
        "category_id",
    ];
    const PARENT_COLUMN: Option<&'static str> = Some("category_id");
    const SEARCH_COLUMN: Option<&'static str> = Some("name");

    fn id(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.name.clone()),
            SqlValue::Text(self.slug.clone()),
            SqlValue::OptText(self.description.clone()),
            SqlValue::Int(self.price),
            SqlValue::Int(self.stock),
            SqlValue::Timestamp(self.date),
            SqlValue::Int(self.category_id),
        ]
    }

    fn from_row(row: &dyn RowReader) -> Result<Self> {
        Ok(Self {
            id: row.int("id")?,
            name: row.text("name")?,
            slug: row.text("slug")?,
            description: row.opt_text("description")?,
            price: row.int("price")?,
            stock: row.int("stock")?,
            date: row.timestamp("date")?,
            category_id: row.int("category_id")?,
            category_name: row.opt_text("category_name")?,
        })
    }
}

impl Entity for ProductImage {
    const TABLE: &'static str = "product_images";
    const SELECT: &'static str = "SELECT t.id, t.name, t.product_id FROM product_images t";
    const COLUMNS: &'static [&'static str] = &["name", "product_id"];
    const PARENT_COLUMN: Option<&'static str> = Some("product_id");

    fn id(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::OptText(self.name.clone()),
            SqlValue::Int(self.product_id),
        ]
    }

    fn from_row(row: &dyn RowReader) -> Result<Self> {
        Ok(Self {
            id: row.int("id")?,
            name: row.opt_text("name")?,
            product_id: row.int("product_id")?,
        })
    }
}
