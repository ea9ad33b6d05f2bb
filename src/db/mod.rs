//! Database layer
//!
//! SQLite (the default, a single file next to the binary) and MySQL are both
//! supported behind the [`DatabasePool`] trait; the driver comes from
//! configuration.
//!
//! ```ignore
//! use showcase::config::DatabaseConfig;
//! use showcase::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
