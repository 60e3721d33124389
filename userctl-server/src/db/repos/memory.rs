//! In-memory user store
//!
//! Same contract as `PgUserStore`: ids from 1, duplicate emails rejected
//! as `DuplicateKey { constraint: "users_email_index" }`, list ordered by id.
//! The uniqueness check and the insert happen under one lock, standing in
//! for the unique index.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::users::{StoreError, UserStore, EMAIL_INDEX};
use crate::models::{NewUser, User};

/// In-memory user store for tests and local runs without Postgres
#[derive(Default)]
pub struct MemoryUserStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    last_id: i32,
    rows: Vec<User>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: &NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().await;

        if inner.rows.iter().any(|row| row.email == user.email()) {
            return Err(StoreError::DuplicateKey {
                constraint: Some(EMAIL_INDEX.to_owned()),
            });
        }

        inner.last_id += 1;
        let now = Utc::now();
        let created = User {
            id: inner.last_id,
            email: user.email().to_owned(),
            name: user.name().to_owned(),
            created_at: now,
            updated_at: now,
        };
        inner.rows.push(created.clone());
        Ok(created)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        // Rows are pushed in id order
        Ok(self.inner.lock().await.rows.clone())
    }

    async fn find_by_id(&self, id: i32) -> Result<User, StoreError> {
        self.inner
            .lock()
            .await
            .rows
            .iter()
            .find(|row| row.id == id)
            .cloned()
            .ok_or(StoreError::NotFound { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_user(email: &str, name: &str) -> NewUser {
        NewUser::new(email, name).unwrap()
    }

    #[tokio::test]
    async fn ids_start_at_one() {
        let store = MemoryUserStore::new();
        let a = store.create(&new_user("a@x.com", "A")).await.unwrap();
        let b = store.create(&new_user("b@x.com", "B")).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let store = MemoryUserStore::new();
        store.create(&new_user("a@x.com", "A")).await.unwrap();

        let err = store.create(&new_user("a@x.com", "B")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_duplicates_one_wins() {
        let store = Arc::new(MemoryUserStore::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .create(&new_user("race@x.com", &format!("racer-{i}")))
                        .await
                })
            })
            .collect();

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn find_missing_is_not_found() {
        let store = MemoryUserStore::new();
        let err = store.find_by_id(7).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 7 }));
    }
}
