//! User repository
//!
//! Handles user persistence with these patterns:
//! - create: plain INSERT; the unique index rejects duplicate emails (no check-then-insert)
//! - list: ordered by id so repeated calls agree
//! - one statement per operation, no caching

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::{NewUser, User};

/// Unique index guarding `users.email`
pub const EMAIL_INDEX: &str = "users_email_index";

/// Store error type
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate key violates unique constraint {}", .constraint.as_deref().unwrap_or("(unnamed)"))]
    DuplicateKey { constraint: Option<String> },

    #[error("not found: user '{id}'")]
    NotFound { id: i32 },

    #[error("database unreachable: {0}")]
    Connection(sqlx::Error),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => Self::DuplicateKey {
                constraint: db.constraint().map(str::to_owned),
            },
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Connection(e),
            other => Self::Database(other),
        }
    }
}

/// Persistence for user records
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. Fails with `DuplicateKey` if the email is taken.
    async fn create(&self, user: &NewUser) -> Result<User, StoreError>;

    /// All users, ordered by id.
    async fn list(&self) -> Result<Vec<User>, StoreError>;

    /// One user by id. Fails with `NotFound` if absent.
    async fn find_by_id(&self, id: i32) -> Result<User, StoreError>;

    /// Cheap reachability check for health probes.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Postgres-backed user store
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: &NewUser) -> Result<User, StoreError> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name)
            VALUES ($1, $2)
            RETURNING id, email, name, "createdAt", "updatedAt"
            "#,
        )
        .bind(user.email())
        .bind(user.name())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(id = created.id, "user created");
        Ok(created)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, "createdAt", "updatedAt"
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn find_by_id(&self, id: i32) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, "createdAt", "updatedAt"
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound { id })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Migrator;
    use crate::test_support::TestDb;

    #[test]
    fn pool_errors_are_connection_errors() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Connection(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Database(_)
        ));
    }

    #[test]
    fn duplicate_key_display_names_constraint() {
        let err = StoreError::DuplicateKey {
            constraint: Some(EMAIL_INDEX.into()),
        };
        assert_eq!(
            err.to_string(),
            "duplicate key violates unique constraint users_email_index"
        );
    }

    // Integration tests - run with DATABASE_URL set
    // cargo test -p userctl-server -- --ignored

    async fn migrated() -> (TestDb, PgUserStore) {
        let db = TestDb::new().await;
        Migrator::new(&db.pool).run_pending().await.unwrap();
        let store = PgUserStore::new(db.pool.clone());
        (db, store)
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn create_then_find() {
        let (db, store) = migrated().await;

        let created = store
            .create(&NewUser::new("u1@test.com", "Alice").unwrap())
            .await
            .unwrap();
        assert_eq!(created.id, 1);

        let found = store.find_by_id(created.id).await.unwrap();
        assert_eq!(found, created);
        db.teardown().await;
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn duplicate_email_rejected_by_index() {
        let (db, store) = migrated().await;

        store
            .create(&NewUser::new("u1@test.com", "Alice").unwrap())
            .await
            .unwrap();
        let err = store
            .create(&NewUser::new("u1@test.com", "Bob").unwrap())
            .await
            .unwrap_err();

        match err {
            StoreError::DuplicateKey { constraint } => {
                assert_eq!(constraint.as_deref(), Some(EMAIL_INDEX))
            }
            other => panic!("expected DuplicateKey, got {other:?}"),
        }
        assert_eq!(store.list().await.unwrap().len(), 1);
        db.teardown().await;
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn concurrent_duplicates_one_wins() {
        let (db, store) = migrated().await;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let user = NewUser::new("race@test.com", &format!("racer-{i}")).unwrap();
                    store.create(&user).await
                })
            })
            .collect();

        let mut wins = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.expect("task panicked") {
                Ok(_) => wins += 1,
                Err(StoreError::DuplicateKey { .. }) => duplicates += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(duplicates, 7);
        assert_eq!(store.list().await.unwrap().len(), 1);
        db.teardown().await;
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn list_is_ordered_and_stable() {
        let (db, store) = migrated().await;

        for email in ["a@x.com", "b@x.com", "c@x.com"] {
            store
                .create(&NewUser::new(email, "n").unwrap())
                .await
                .unwrap();
        }

        let first = store.list().await.unwrap();
        let emails: Vec<_> = first.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, ["a@x.com", "b@x.com", "c@x.com"]);
        assert_eq!(store.list().await.unwrap(), first);
        db.teardown().await;
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn find_missing_is_not_found() {
        let (db, store) = migrated().await;
        let err = store.find_by_id(42).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 42 }));
        db.teardown().await;
    }
}
