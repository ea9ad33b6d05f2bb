//! Catalog service
//!
//! Categories, products and product images. Every update and delete looks
//! the record up first so a vanished identity surfaces as
//! [`ServiceError::NotFound`] instead of a silent no-op.
//!
//! Categories and products do not cascade: deleting one that still has
//! children fails with the storage error raised by the foreign key.

use serde::Deserialize;
use std::sync::Arc;

use super::error::ServiceError;
use super::file_store::{FileStore, Upload, PRODUCT_IMAGES};
use super::validation;
use crate::config::ListingConfig;
use crate::db::repositories::Repository;
use crate::models::{Category, Product, ProductImage};
use crate::pager::Page;

/// Input for creating or renaming a category
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
}

/// Input for creating or updating a product
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: i64,
    pub stock: i64,
    pub category_id: i64,
}

pub struct CatalogService {
    categories: Arc<dyn Repository<Category>>,
    products: Arc<dyn Repository<Product>>,
    images: Arc<dyn Repository<ProductImage>>,
    files: Arc<dyn FileStore>,
    listing: ListingConfig,
}

impl CatalogService {
    pub fn new(
        categories: Arc<dyn Repository<Category>>,
        products: Arc<dyn Repository<Product>>,
        images: Arc<dyn Repository<ProductImage>>,
        files: Arc<dyn FileStore>,
        listing: ListingConfig,
    ) -> Self {
        Self {
            categories,
            products,
            images,
            files,
            listing,
        }
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    pub async fn list_categories(&self) -> Result<Vec<Category>, ServiceError> {
        Ok(self.categories.get_all().await?)
    }

    pub async fn get_category(&self, id: i64) -> Result<Category, ServiceError> {
        self.categories
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Category", id))
    }

    pub async fn create_category(&self, input: CategoryInput) -> Result<Category, ServiceError> {
        let name = validation::required("Name", &input.name)?;
        let category = self.categories.add(&Category::new(name)).await?;
        tracing::info!("Created category {} ({})", category.id, category.name);
        Ok(category)
    }

    pub async fn update_category(
        &self,
        id: i64,
        input: CategoryInput,
    ) -> Result<Category, ServiceError> {
        let name = validation::required("Name", &input.name)?;
        let mut category = self.get_category(id).await?;
        category.name = name;
        Ok(self.categories.update(&category).await?)
    }

    pub async fn delete_category(&self, id: i64) -> Result<(), ServiceError> {
        self.get_category(id).await?;
        self.categories.delete(id).await?;
        tracing::info!("Deleted category {}", id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Products
    // ------------------------------------------------------------------

    pub async fn list_products(&self, page: i64) -> Result<Page<Product>, ServiceError> {
        Ok(self
            .products
            .get_paged(page, self.listing.products_per_page)
            .await?)
    }

    pub async fn all_products(&self) -> Result<Vec<Product>, ServiceError> {
        Ok(self.products.get_all().await?)
    }

    /// Case-sensitive search on product names
    pub async fn search_products(
        &self,
        term: &str,
        page: i64,
    ) -> Result<Page<Product>, ServiceError> {
        Ok(self
            .products
            .get_paged_by_search(term, page, self.listing.product_search_per_page)
            .await?)
    }

    /// One page of the products of a category, together with the category
    pub async fn products_by_category(
        &self,
        category_id: i64,
        page: i64,
    ) -> Result<(Category, Page<Product>), ServiceError> {
        let category = self.get_category(category_id).await?;
        let products = self
            .products
            .get_paged_by_parent(category_id, page, self.listing.products_per_page)
            .await?;
        Ok((category, products))
    }

    pub async fn get_product(&self, id: i64) -> Result<Product, ServiceError> {
        self.products
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", id))
    }

    pub async fn create_product(&self, input: ProductInput) -> Result<Product, ServiceError> {
        let product = self.validate_product(input).await?;
        let product = self.products.add(&product).await?;
        tracing::info!("Created product {} ({})", product.id, product.slug);
        Ok(product)
    }

    /// Replace the product's fields; slug and date are recomputed
    pub async fn update_product(
        &self,
        id: i64,
        input: ProductInput,
    ) -> Result<Product, ServiceError> {
        self.get_product(id).await?;
        let mut product = self.validate_product(input).await?;
        product.id = id;
        Ok(self.products.update(&product).await?)
    }

    pub async fn delete_product(&self, id: i64) -> Result<(), ServiceError> {
        self.get_product(id).await?;
        self.products.delete(id).await?;
        tracing::info!("Deleted product {}", id);
        Ok(())
    }

    async fn validate_product(&self, input: ProductInput) -> Result<Product, ServiceError> {
        let name = validation::required("Name", &input.name)?;
        let price = validation::price(input.price)?;
        let stock = validation::stock(input.stock)?;
        if self.categories.get_by_id(input.category_id).await?.is_none() {
            return Err(ServiceError::Validation(format!(
                "Category {} does not exist",
                input.category_id
            )));
        }
        let description = validation::optional(input.description.as_deref());
        Ok(Product::new(name, description, price, stock, input.category_id))
    }

    // ------------------------------------------------------------------
    // Product images
    // ------------------------------------------------------------------

    pub async fn product_images(
        &self,
        product_id: i64,
    ) -> Result<(Product, Vec<ProductImage>), ServiceError> {
        let product = self.get_product(product_id).await?;
        let images = self.images.get_all_by_parent(product_id).await?;
        Ok((product, images))
    }

    /// Store the file, then record it. A failed insert removes the file again.
    pub async fn add_product_image(
        &self,
        product_id: i64,
        upload: &Upload,
    ) -> Result<ProductImage, ServiceError> {
        self.get_product(product_id).await?;

        let name = self.files.save(PRODUCT_IMAGES, upload).await?;
        match self.images.add(&ProductImage::new(name.clone(), product_id)).await {
            Ok(image) => {
                tracing::info!("Stored image {} for product {}", name, product_id);
                Ok(image)
            }
            Err(e) => {
                if let Err(cleanup) = self.files.remove(PRODUCT_IMAGES, &name).await {
                    tracing::warn!("Failed to remove orphaned image {}: {}", name, cleanup);
                }
                Err(e.into())
            }
        }
    }

    /// Delete the image row, then its file. Returns the deleted record.
    pub async fn delete_product_image(&self, id: i64) -> Result<ProductImage, ServiceError> {
        let image = self
            .images
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product image", id))?;

        self.images.delete(id).await?;
        if let Some(name) = image.name.as_deref() {
            if let Err(e) = self.files.remove(PRODUCT_IMAGES, name).await {
                tracing::warn!("Failed to remove image file {}: {}", name, e);
            }
        }
        Ok(image)
    }
}
