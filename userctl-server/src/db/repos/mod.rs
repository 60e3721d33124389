//! Repository implementations for database access
//!
//! Each repository follows these patterns:
//! - Handles conflicts via constraints (no check-then-insert)
//! - One statement per operation

pub mod users;
pub mod memory;

pub use users::{PgUserStore, StoreError, UserStore, EMAIL_INDEX};
pub use memory::MemoryUserStore;
