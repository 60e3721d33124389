//! Schema migration registry and runner.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing name order.
//! - Apply or revert one migration at a time, each in its own transaction.
//! - Record applied migrations in `schema_migrations`.
//!
//! # Invariants
//! - Names are `<UTC timestamp>-<slug>`; lexicographic order is application order.
//! - A migration's SQL and its bookkeeping row commit together or not at all.
//!   A failed `up` leaves the schema untouched and the migration pending.
//! - A migration's own `up` is not idempotent. Running it twice fails
//!   (the relation already exists); the bookkeeping table is what stops
//!   the runner from trying.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

/// A named, reversible schema change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub name: &'static str,
    pub up: &'static str,
    pub down: &'static str,
}

/// All migrations known to this binary, in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "20250418000000-create-users",
        up: include_str!("../../migrations/20250418000000-create-users.up.sql"),
        down: include_str!("../../migrations/20250418000000-create-users.down.sql"),
    },
    Migration {
        name: "20250418134043-add-user-email-index",
        up: include_str!("../../migrations/20250418134043-add-user-email-index.up.sql"),
        down: include_str!("../../migrations/20250418134043-add-user-email-index.down.sql"),
    },
];

/// Look up a registered migration by name.
pub fn find(name: &str) -> Option<&'static Migration> {
    MIGRATIONS.iter().find(|m| m.name == name)
}

impl Migration {
    /// Run this migration's `up` SQL on a connection, without bookkeeping.
    pub async fn apply_up(&self, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(self.up).execute(conn).await?;
        Ok(())
    }

    /// Run this migration's `down` SQL on a connection, without bookkeeping.
    pub async fn apply_down(&self, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(self.down).execute(conn).await?;
        Ok(())
    }
}

/// Migration direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => f.write_str("up"),
            Self::Down => f.write_str("down"),
        }
    }
}

/// Migration error type
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration '{name}' failed ({direction}): {source}")]
    Failed {
        name: &'static str,
        direction: Direction,
        #[source]
        source: sqlx::Error,
    },

    #[error("migrations out of order: '{previous}' must sort before '{next}'")]
    OutOfOrder {
        previous: &'static str,
        next: &'static str,
    },

    #[error("database records migration '{name}' which this binary does not know")]
    UnknownMigration { name: String },
}

/// Applied/pending state of one registered migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub name: &'static str,
    pub applied_at: Option<DateTime<Utc>>,
}

impl MigrationStatus {
    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

/// Check that names are unique and strictly increasing.
pub fn validate_order(migrations: &[Migration]) -> Result<(), MigrationError> {
    for pair in migrations.windows(2) {
        if pair[0].name >= pair[1].name {
            return Err(MigrationError::OutOfOrder {
                previous: pair[0].name,
                next: pair[1].name,
            });
        }
    }
    Ok(())
}

/// Migration runner over a pool
pub struct Migrator<'a> {
    pool: &'a PgPool,
    migrations: &'static [Migration],
}

impl<'a> Migrator<'a> {
    /// Runner over the built-in [`MIGRATIONS`].
    pub fn new(pool: &'a PgPool) -> Self {
        Self::with_migrations(pool, MIGRATIONS)
    }

    pub fn with_migrations(pool: &'a PgPool, migrations: &'static [Migration]) -> Self {
        Self { pool, migrations }
    }

    /// Apply the next pending migration.
    ///
    /// Returns its name, or `None` when the schema is current.
    pub async fn up(&self) -> Result<Option<&'static str>, MigrationError> {
        let applied = self.applied().await?;
        let Some(next) = self
            .migrations
            .iter()
            .find(|m| !applied.contains_key(m.name))
        else {
            tracing::debug!("schema is up to date");
            return Ok(None);
        };

        self.apply(next, Direction::Up).await?;
        Ok(Some(next.name))
    }

    /// Revert the most recently applied migration.
    ///
    /// Returns its name, or `None` when nothing is applied.
    pub async fn down(&self) -> Result<Option<&'static str>, MigrationError> {
        let applied = self.applied().await?;
        let Some(last) = self
            .migrations
            .iter()
            .rev()
            .find(|m| applied.contains_key(m.name))
        else {
            tracing::debug!("no applied migrations to revert");
            return Ok(None);
        };

        self.apply(last, Direction::Down).await?;
        Ok(Some(last.name))
    }

    /// Apply every pending migration in order.
    ///
    /// Stops at the first failure; migrations applied before it stay applied.
    pub async fn run_pending(&self) -> Result<Vec<&'static str>, MigrationError> {
        let mut applied = Vec::new();
        while let Some(name) = self.up().await? {
            applied.push(name);
        }
        tracing::info!(count = applied.len(), "migrations complete");
        Ok(applied)
    }

    /// Applied state of every registered migration, in order.
    pub async fn status(&self) -> Result<Vec<MigrationStatus>, MigrationError> {
        let applied = self.applied().await?;
        Ok(self
            .migrations
            .iter()
            .map(|m| MigrationStatus {
                name: m.name,
                applied_at: applied.get(m.name).copied(),
            })
            .collect())
    }

    async fn ensure_table(&self) -> Result<(), MigrationError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                name TEXT PRIMARY KEY,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Applied migrations keyed by name.
    ///
    /// Fails if the registry is misordered or if the database records a
    /// migration the registry lacks.
    async fn applied(&self) -> Result<HashMap<String, DateTime<Utc>>, MigrationError> {
        validate_order(self.migrations)?;
        self.ensure_table().await?;

        let rows: Vec<(String, DateTime<Utc>)> =
            sqlx::query_as("SELECT name, applied_at FROM schema_migrations ORDER BY name")
                .fetch_all(self.pool)
                .await?;

        if let Some((name, _)) = rows
            .iter()
            .find(|(name, _)| !self.migrations.iter().any(|m| m.name == name.as_str()))
        {
            return Err(MigrationError::UnknownMigration { name: name.clone() });
        }

        Ok(rows.into_iter().collect())
    }

    async fn apply(
        &self,
        migration: &'static Migration,
        direction: Direction,
    ) -> Result<(), MigrationError> {
        let failed = |source| MigrationError::Failed {
            name: migration.name,
            direction,
            source,
        };

        let mut tx = self.pool.begin().await?;

        let result = match direction {
            Direction::Up => migration.apply_up(&mut tx).await,
            Direction::Down => migration.apply_down(&mut tx).await,
        };
        if let Err(e) = result {
            tracing::error!(migration = migration.name, %direction, error = %e, "migration failed");
            // Report the migration error even if the rollback fails.
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(migration = migration.name, error = %rollback, "rollback failed");
            }
            return Err(failed(e));
        }

        let bookkeeping = match direction {
            Direction::Up => "INSERT INTO schema_migrations (name) VALUES ($1)",
            Direction::Down => "DELETE FROM schema_migrations WHERE name = $1",
        };
        sqlx::query(bookkeeping)
            .bind(migration.name)
            .execute(&mut *tx)
            .await
            .map_err(failed)?;

        tx.commit().await?;
        tracing::info!(migration = migration.name, %direction, "migration applied");
        Ok(())
    }
}
