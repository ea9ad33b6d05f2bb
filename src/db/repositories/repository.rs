//! Generic repository
//!
//! [`Repository`] is the only way services reach storage. [`SqlxRepository`]
//! implements it once for every [`Entity`] on both SQLite and MySQL.
//!
//! Listings are ordered newest first (`ORDER BY t.id DESC`). The paged
//! variants are built from `count` and `fetch` through the pager, so they
//! share its page-number policy.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::pager::{create_page, Page, PageSource, PagerError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::marker::PhantomData;
use std::sync::Arc;

use super::entity::{bind_all_mysql, bind_all_sqlite, Entity, SqlValue};

/// Which records of a table a listing covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListFilter {
    All,
    /// Children of one parent record
    Parent(i64),
    /// Case-sensitive substring match on the search column
    Search(String),
}

impl ListFilter {
    /// Search filter; a blank term lists everything
    pub fn search(term: &str) -> Self {
        if term.trim().is_empty() {
            ListFilter::All
        } else {
            ListFilter::Search(term.to_string())
        }
    }
}

/// Data access for one entity type
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Record with the given identity, `None` when absent
    async fn get_by_id(&self, id: i64) -> Result<Option<E>>;

    /// Every record matching the filter, newest first
    async fn list(&self, filter: &ListFilter) -> Result<Vec<E>>;

    /// Number of records matching the filter
    async fn count(&self, filter: &ListFilter) -> Result<u64>;

    /// A window of the filtered listing
    async fn fetch(&self, filter: &ListFilter, offset: u64, limit: u64) -> Result<Vec<E>>;

    /// Store a new record and return it with its assigned identity
    async fn add(&self, entity: &E) -> Result<E>;

    /// Overwrite every writable column of an existing record
    async fn update(&self, entity: &E) -> Result<E>;

    /// Remove a record; absent identities are ignored
    async fn delete(&self, id: i64) -> Result<()>;

    async fn get_all(&self) -> Result<Vec<E>> {
        self.list(&ListFilter::All).await
    }

    async fn get_all_by_parent(&self, parent_id: i64) -> Result<Vec<E>> {
        self.list(&ListFilter::Parent(parent_id)).await
    }

    async fn get_paged(&self, page: i64, page_size: i64) -> Result<Page<E>, PagerError> {
        create_page(&Listing::new(self, ListFilter::All), page, page_size).await
    }

    async fn get_paged_by_parent(
        &self,
        parent_id: i64,
        page: i64,
        page_size: i64,
    ) -> Result<Page<E>, PagerError> {
        create_page(&Listing::new(self, ListFilter::Parent(parent_id)), page, page_size).await
    }

    /// Paged search; a blank term behaves exactly like [`Repository::get_paged`]
    async fn get_paged_by_search(
        &self,
        term: &str,
        page: i64,
        page_size: i64,
    ) -> Result<Page<E>, PagerError> {
        create_page(&Listing::new(self, ListFilter::search(term)), page, page_size).await
    }
}

/// A filtered listing of a repository, seen as a page source
pub struct Listing<'a, R: ?Sized> {
    repo: &'a R,
    filter: ListFilter,
}

impl<'a, R: ?Sized> Listing<'a, R> {
    pub fn new(repo: &'a R, filter: ListFilter) -> Self {
        Self { repo, filter }
    }
}

#[async_trait]
impl<'a, E, R> PageSource<E> for Listing<'a, R>
where
    E: Entity,
    R: Repository<E> + ?Sized,
{
    async fn count(&self) -> Result<u64> {
        self.repo.count(&self.filter).await
    }

    async fn fetch(&self, offset: u64, limit: u64) -> Result<Vec<E>> {
        self.repo.fetch(&self.filter, offset, limit).await
    }
}

/// SQLx-based repository for any [`Entity`]
pub struct SqlxRepository<E> {
    pool: DynDatabasePool,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> SqlxRepository<E> {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    /// Create a shared repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn Repository<E>> {
        Arc::new(Self::new(pool))
    }

    /// Newest record satisfying `condition`, a SQL boolean expression over
    /// the `t` alias with `?` placeholders for `params`
    pub async fn find_first(&self, condition: &str, params: Vec<SqlValue>) -> Result<Option<E>> {
        let sql = format!("{} WHERE {} ORDER BY t.id DESC LIMIT 1", E::SELECT, condition);
        Ok(self.query_rows(&sql, params).await?.into_iter().next())
    }

    fn filter_clause(&self, filter: &ListFilter) -> Result<(String, Vec<SqlValue>)> {
        match filter {
            ListFilter::All => Ok((String::new(), Vec::new())),
            ListFilter::Parent(parent_id) => {
                let column = E::PARENT_COLUMN
                    .with_context(|| format!("{} has no parent column", E::TABLE))?;
                Ok((
                    format!(" WHERE t.{} = ?", column),
                    vec![SqlValue::Int(*parent_id)],
                ))
            }
            ListFilter::Search(term) => {
                let column = E::SEARCH_COLUMN
                    .with_context(|| format!("{} is not searchable", E::TABLE))?;
                let condition = match self.pool.driver() {
                    DatabaseDriver::Sqlite => format!("instr(t.{}, ?) > 0", column),
                    DatabaseDriver::Mysql => {
                        format!("LOCATE(CAST(? AS BINARY), CAST(t.{} AS BINARY)) > 0", column)
                    }
                };
                Ok((
                    format!(" WHERE {}", condition),
                    vec![SqlValue::Text(term.clone())],
                ))
            }
        }
    }

    async fn query_rows(&self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<E>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => query_rows_sqlite(self.pool.sqlite()?, sql, params).await,
            DatabaseDriver::Mysql => query_rows_mysql(self.pool.mysql()?, sql, params).await,
        }
    }

    async fn query_count(&self, sql: &str, params: Vec<SqlValue>) -> Result<u64> {
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => query_count_sqlite(self.pool.sqlite()?, sql, params).await?,
            DatabaseDriver::Mysql => query_count_mysql(self.pool.mysql()?, sql, params).await?,
        };
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> Result<Executed> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => execute_sqlite(self.pool.sqlite()?, sql, params).await,
            DatabaseDriver::Mysql => execute_mysql(self.pool.mysql()?, sql, params).await,
        }
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for SqlxRepository<E> {
    async fn get_by_id(&self, id: i64) -> Result<Option<E>> {
        let sql = format!("{} WHERE t.id = ?", E::SELECT);
        let rows = self
            .query_rows(&sql, vec![SqlValue::Int(id)])
            .await
            .with_context(|| format!("Failed to get {} by ID", E::TABLE))?;
        Ok(rows.into_iter().next())
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<E>> {
        let (clause, params) = self.filter_clause(filter)?;
        let sql = format!("{}{} ORDER BY t.id DESC", E::SELECT, clause);
        self.query_rows(&sql, params)
            .await
            .with_context(|| format!("Failed to list {}", E::TABLE))
    }

    async fn count(&self, filter: &ListFilter) -> Result<u64> {
        let (clause, params) = self.filter_clause(filter)?;
        let sql = format!("SELECT COUNT(*) FROM {} t{}", E::TABLE, clause);
        self.query_count(&sql, params)
            .await
            .with_context(|| format!("Failed to count {}", E::TABLE))
    }

    async fn fetch(&self, filter: &ListFilter, offset: u64, limit: u64) -> Result<Vec<E>> {
        let (clause, mut params) = self.filter_clause(filter)?;
        let sql = format!("{}{} ORDER BY t.id DESC LIMIT ? OFFSET ?", E::SELECT, clause);
        params.push(SqlValue::Int(i64::try_from(limit).unwrap_or(i64::MAX)));
        params.push(SqlValue::Int(i64::try_from(offset).unwrap_or(i64::MAX)));
        self.query_rows(&sql, params)
            .await
            .with_context(|| format!("Failed to fetch page of {}", E::TABLE))
    }

    async fn add(&self, entity: &E) -> Result<E> {
        let placeholders = vec!["?"; E::COLUMNS.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            E::TABLE,
            E::COLUMNS.join(", "),
            placeholders
        );

        let executed = self
            .execute(&sql, entity.values())
            .await
            .with_context(|| format!("Failed to insert into {}", E::TABLE))?;

        self.get_by_id(executed.last_insert_id)
            .await?
            .with_context(|| format!("Inserted {} row disappeared", E::TABLE))
    }

    async fn update(&self, entity: &E) -> Result<E> {
        let assignments = E::COLUMNS
            .iter()
            .map(|column| format!("{} = ?", column))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {} SET {} WHERE id = ?", E::TABLE, assignments);

        let mut params = entity.values();
        params.push(SqlValue::Int(entity.id()));

        self.execute(&sql, params)
            .await
            .with_context(|| format!("Failed to update {} {}", E::TABLE, entity.id()))?;

        self.get_by_id(entity.id())
            .await?
            .with_context(|| format!("{} {} not found after update", E::TABLE, entity.id()))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        if self.get_by_id(id).await?.is_none() {
            return Ok(());
        }

        let sql = format!("DELETE FROM {} WHERE id = ?", E::TABLE);
        self.execute(&sql, vec![SqlValue::Int(id)])
            .await
            .with_context(|| format!("Failed to delete {} {}", E::TABLE, id))?;
        Ok(())
    }
}

/// Outcome of a write statement
struct Executed {
    last_insert_id: i64,
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn query_rows_sqlite<E: Entity>(
    pool: &SqlitePool,
    sql: &str,
    params: Vec<SqlValue>,
) -> Result<Vec<E>> {
    let rows = bind_all_sqlite(sqlx::query(sql), params)
        .fetch_all(pool)
        .await?;
    rows.iter().map(|row| E::from_row(row)).collect()
}

async fn query_count_sqlite(pool: &SqlitePool, sql: &str, params: Vec<SqlValue>) -> Result<i64> {
    let row = bind_all_sqlite(sqlx::query(sql), params)
        .fetch_one(pool)
        .await?;
    Ok(row.try_get(0)?)
}

async fn execute_sqlite(pool: &SqlitePool, sql: &str, params: Vec<SqlValue>) -> Result<Executed> {
    let result = bind_all_sqlite(sqlx::query(sql), params)
        .execute(pool)
        .await?;
    Ok(Executed {
        last_insert_id: result.last_insert_rowid(),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn query_rows_mysql<E: Entity>(
    pool: &MySqlPool,
    sql: &str,
    params: Vec<SqlValue>,
) -> Result<Vec<E>> {
    let rows = bind_all_mysql(sqlx::query(sql), params)
        .fetch_all(pool)
        .await?;
    rows.iter().map(|row| E::from_row(row)).collect()
}

async fn query_count_mysql(pool: &MySqlPool, sql: &str, params: Vec<SqlValue>) -> Result<i64> {
    let row = bind_all_mysql(sqlx::query(sql), params)
        .fetch_one(pool)
        .await?;
    Ok(row.try_get(0)?)
}

async fn execute_mysql(pool: &MySqlPool, sql: &str, params: Vec<SqlValue>) -> Result<Executed> {
    let result = bind_all_mysql(sqlx::query(sql), params)
        .execute(pool)
        .await?;
    Ok(Executed {
        last_insert_id: i64::try_from(result.last_insert_id()).unwrap_or(i64::MAX),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Category, Product};

    async fn setup_test_repos() -> (
        DynDatabasePool,
        SqlxRepository<Category>,
        SqlxRepository<Product>,
    ) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        (
            pool.clone(),
            SqlxRepository::new(pool.clone()),
            SqlxRepository::new(pool),
        )
    }

    async fn seed_products(
        categories: &SqlxRepository<Category>,
        products: &SqlxRepository<Product>,
        names: &[&str],
    ) -> (Category, Vec<Product>) {
        let category = categories
            .add(&Category::new("Tools"))
            .await
            .expect("Failed to add category");
        let mut added = Vec::new();
        for name in names {
            let product = Product::new(*name, None, 10, 1, category.id);
            added.push(products.add(&product).await.expect("Failed to add product"));
        }
        (category, added)
    }

    #[tokio::test]
    async fn test_add_assigns_identity_and_round_trips() {
        let (_pool, categories, _products) = setup_test_repos().await;

        let added = categories.add(&Category::new("Garden")).await.unwrap();
        assert!(added.id > 0);

        let fetched = categories.get_by_id(added.id).await.unwrap().unwrap();
        assert_eq!(fetched, added);
        assert_eq!(fetched.name, "Garden");
    }

    #[tokio::test]
    async fn test_get_by_id_twice_is_identical() {
        let (_pool, categories, products) = setup_test_repos().await;
        let (_, added) = seed_products(&categories, &products, &["Hammer"]).await;

        let first = products.get_by_id(added[0].id).await.unwrap();
        let second = products.get_by_id(added[0].id).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_get_by_id_missing_returns_none() {
        let (_pool, categories, _products) = setup_test_repos().await;
        assert!(categories.get_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_all_is_newest_first_with_parent_name() {
        let (_pool, categories, products) = setup_test_repos().await;
        seed_products(&categories, &products, &["Hammer", "Saw", "Drill"]).await;

        let all = products.get_all().await.unwrap();
        let names: Vec<&str> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Drill", "Saw", "Hammer"]);
        assert!(all.iter().all(|p| p.category_name.as_deref() == Some("Tools")));
    }

    #[tokio::test]
    async fn test_update_overwrites_columns() {
        let (_pool, categories, _products) = setup_test_repos().await;
        let mut category = categories.add(&Category::new("Old")).await.unwrap();

        category.name = "New".to_string();
        let updated = categories.update(&category).await.unwrap();
        assert_eq!(updated.name, "New");

        let fetched = categories.get_by_id(category.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "New");
    }

    #[tokio::test]
    async fn test_delete_then_get_returns_none() {
        let (_pool, categories, _products) = setup_test_repos().await;
        let category = categories.add(&Category::new("Temp")).await.unwrap();

        categories.delete(category.id).await.unwrap();
        assert!(categories.get_by_id(category.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let (_pool, categories, _products) = setup_test_repos().await;
        categories.delete(12345).await.expect("Deleting a missing id must succeed");
    }

    #[tokio::test]
    async fn test_delete_restricted_parent_fails() {
        let (_pool, categories, products) = setup_test_repos().await;
        let (category, _) = seed_products(&categories, &products, &["Hammer"]).await;

        let result = categories.delete(category.id).await;
        assert!(result.is_err());
        assert!(categories.get_by_id(category.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_get_paged_slices_newest_first() {
        let (_pool, categories, products) = setup_test_repos().await;
        seed_products(&categories, &products, &["p1", "p2", "p3", "p4", "p5", "p6", "p7"]).await;

        let page = products.get_paged(1, 3).await.unwrap();
        let names: Vec<&str> = page.items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["p7", "p6", "p5"]);
        assert_eq!(page.total_items, 7);
        assert_eq!(page.total_pages(), 3);

        let last = products.get_paged(3, 3).await.unwrap();
        let names: Vec<&str> = last.items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["p1"]);

        let beyond = products.get_paged(4, 3).await.unwrap();
        assert!(beyond.is_empty());
        assert_eq!(beyond.total_items, 7);
    }

    #[tokio::test]
    async fn test_get_paged_rejects_page_zero() {
        let (_pool, _categories, products) = setup_test_repos().await;
        let result = products.get_paged(0, 3).await;
        assert!(matches!(result, Err(PagerError::InvalidPageNumber(0))));
    }

    #[tokio::test]
    async fn test_get_paged_by_parent_filters() {
        let (_pool, categories, products) = setup_test_repos().await;
        let (tools, _) = seed_products(&categories, &products, &["Hammer", "Saw"]).await;

        let garden = categories.add(&Category::new("Garden")).await.unwrap();
        products
            .add(&Product::new("Rake", None, 5, 1, garden.id))
            .await
            .unwrap();

        let page = products.get_paged_by_parent(tools.id, 1, 10).await.unwrap();
        assert_eq!(page.total_items, 2);
        assert!(page.items.iter().all(|p| p.category_id == tools.id));

        let page = products.get_paged_by_parent(garden.id, 1, 10).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "Rake");

        let children = products.get_all_by_parent(garden.id).await.unwrap();
        assert_eq!(children.len(), 1);
    }

    #[tokio::test]
    async fn test_search_is_case_sensitive_substring() {
        let (_pool, categories, products) = setup_test_repos().await;
        seed_products(&categories, &products, &["Red Hammer", "hammer drill", "Saw"]).await;

        let page = products.get_paged_by_search("Hammer", 1, 5).await.unwrap();
        let names: Vec<&str> = page.items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Red Hammer"]);

        let page = products.get_paged_by_search("amme", 1, 5).await.unwrap();
        assert_eq!(page.total_items, 2);
    }

    #[tokio::test]
    async fn test_empty_search_matches_get_paged() {
        let (_pool, categories, products) = setup_test_repos().await;
        seed_products(&categories, &products, &["a", "b", "c", "d"]).await;

        for page_number in 1..=3 {
            let searched = products.get_paged_by_search("", page_number, 3).await.unwrap();
            let paged = products.get_paged(page_number, 3).await.unwrap();
            assert_eq!(searched, paged);
        }

        let blank = products.get_paged_by_search("   ", 1, 3).await.unwrap();
        assert_eq!(blank.total_items, 4);
    }

    #[tokio::test]
    async fn test_parent_filter_on_parentless_entity_errors() {
        let (_pool, categories, _products) = setup_test_repos().await;
        assert!(categories.get_paged_by_parent(1, 1, 2).await.is_err());
    }

    #[tokio::test]
    async fn test_find_first_condition() {
        let (_pool, categories, _products) = setup_test_repos().await;
        categories.add(&Category::new("Alpha")).await.unwrap();
        let beta = categories.add(&Category::new("Beta")).await.unwrap();

        let found = categories
            .find_first("t.name = ?", vec![SqlValue::Text("Beta".to_string())])
            .await
            .unwrap();
        assert_eq!(found, Some(beta));

        let missing = categories
            .find_first("t.name = ?", vec![SqlValue::Text("Gamma".to_string())])
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_blank_search_term_is_unfiltered() {
        assert_eq!(ListFilter::search(""), ListFilter::All);
        assert_eq!(ListFilter::search("  \t"), ListFilter::All);
        assert_eq!(
            ListFilter::search(" Saw"),
            ListFilter::Search(" Saw".to_string())
        );
    }
}
