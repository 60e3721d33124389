//! userctl-server: user records over Postgres
//!
//! Exposes create/list/get for users via HTTP, backed by a single
//! `users` table whose schema is owned by ordered, reversible migrations.
//!
//! Wiring is explicit:
//! `DbConfig` → `PgPool` → `Migrator` → `PgUserStore` → `UserService` → router.

pub mod config;
pub mod db;
pub mod http;
pub mod models;
pub mod service;

pub use config::{ConfigError, DbConfig};
pub use db::migrations::{MigrationError, Migrator};
pub use db::repos::{MemoryUserStore, PgUserStore, StoreError, UserStore};
pub use http::{build_router, run_server, AppState, ServerConfig};
pub use service::{ServiceError, UserService};

#[cfg(test)]
pub(crate) mod test_support;
