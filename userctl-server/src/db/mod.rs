//! Database layer for userctl
//!
//! - `pool`: connection pool from `DbConfig`
//! - `migrations`: ordered schema changes and their runner
//! - `repos`: the user record store

pub mod pool;
pub mod migrations;
pub mod repos;

pub use pool::create_pool;
pub use migrations::{Migration, MigrationError, MigrationStatus, Migrator, MIGRATIONS};
