//! Database layer
//!
//! SQLite is the default backend; MySQL is supported for larger deployments.
//! Repositories receive a `DynDatabasePool` and dispatch on `pool.backend()`
//! to run the right SQL dialect.

pub mod migrations;
pub mod pool;
pub mod repositories;
pub mod seed;

pub use pool::{
    create_pool, create_test_pool, is_unique_violation, Backend, DatabasePool, DynDatabasePool,
    MysqlDatabase, SqliteDatabase,
};
