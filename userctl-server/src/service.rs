//! User use-case service.
//!
//! # Responsibility
//! - Validate create input before it reaches the store.
//! - Translate store errors into domain errors.
//!
//! # Invariants
//! - Invalid input is never forwarded to the store.
//! - Uniqueness is left to the store's unique index; there is no pre-check.

use std::sync::Arc;

use crate::db::repos::{StoreError, UserStore};
use crate::models::{CreateUserDto, NewUser, User, ValidationError};

/// Domain error type
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("email '{email}' already exists")]
    EmailAlreadyExists { email: String },

    #[error("user {id} not found")]
    UserNotFound { id: i32 },

    #[error(transparent)]
    Store(StoreError),
}

/// Cloneable handle over a user store
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Validate and create a user.
    pub async fn create(&self, dto: CreateUserDto) -> Result<User, ServiceError> {
        let new_user = NewUser::try_from(dto)?;

        match self.store.create(&new_user).await {
            Ok(user) => {
                tracing::info!(id = user.id, "user created");
                Ok(user)
            }
            Err(StoreError::DuplicateKey { .. }) => {
                tracing::debug!(email = new_user.email(), "duplicate email rejected");
                Err(ServiceError::EmailAlreadyExists {
                    email: new_user.email().to_owned(),
                })
            }
            Err(e) => Err(ServiceError::Store(e)),
        }
    }

    /// All users, ordered by id.
    pub async fn find_all(&self) -> Result<Vec<User>, ServiceError> {
        self.store.list().await.map_err(ServiceError::Store)
    }

    /// One user by id.
    pub async fn find_one(&self, id: i32) -> Result<User, ServiceError> {
        self.store.find_by_id(id).await.map_err(|e| match e {
            StoreError::NotFound { id } => ServiceError::UserNotFound { id },
            other => ServiceError::Store(other),
        })
    }

    /// Check that the store answers.
    pub async fn ping(&self) -> Result<(), ServiceError> {
        self.store.ping().await.map_err(ServiceError::Store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::MemoryUserStore;
    use async_trait::async_trait;

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryUserStore::new()))
    }

    fn dto(email: &str, name: &str) -> CreateUserDto {
        CreateUserDto {
            email: email.into(),
            name: name.into(),
        }
    }

    #[tokio::test]
    async fn create_then_find_one() {
        let svc = service();
        let created = svc.create(dto("u1@test.com", "Alice")).await.unwrap();

        let found = svc.find_one(created.id).await.unwrap();
        assert_eq!(found.email, "u1@test.com");
        assert_eq!(found.name, "Alice");
    }

    #[tokio::test]
    async fn duplicate_email_scenario() {
        let svc = service();

        let alice = svc.create(dto("u1@test.com", "Alice")).await.unwrap();
        assert_eq!(alice.id, 1);

        let err = svc.create(dto("u1@test.com", "Bob")).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::EmailAlreadyExists { ref email } if email == "u1@test.com"
        ));

        let all = svc.find_all().await.unwrap();
        assert_eq!(all, vec![alice]);
    }

    #[tokio::test]
    async fn find_one_missing() {
        let err = service().find_one(99).await.unwrap_err();
        assert!(matches!(err, ServiceError::UserNotFound { id: 99 }));
    }

    #[tokio::test]
    async fn find_all_returns_created_in_order() {
        let svc = service();
        for email in ["a@x.com", "b@x.com", "c@x.com"] {
            svc.create(dto(email, "n")).await.unwrap();
        }

        let emails: Vec<_> = svc
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.email)
            .collect();
        assert_eq!(emails, ["a@x.com", "b@x.com", "c@x.com"]);
    }

    /// Store that fails the test if it is ever called.
    struct UnreachableStore;

    #[async_trait]
    impl UserStore for UnreachableStore {
        async fn create(&self, _: &NewUser) -> Result<User, StoreError> {
            panic!("invalid input reached the store")
        }
        async fn list(&self) -> Result<Vec<User>, StoreError> {
            panic!("unexpected list")
        }
        async fn find_by_id(&self, _: i32) -> Result<User, StoreError> {
            panic!("unexpected find_by_id")
        }
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_store() {
        let svc = UserService::new(Arc::new(UnreachableStore));

        for (email, name) in [
            ("", "Alice"),
            ("not-an-email", "Alice"),
            ("a@x.com", ""),
            ("n@x.com", "a\u{0}b"),
        ] {
            let err = svc.create(dto(email, name)).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }
    }

    /// Store that is always down.
    struct DownStore;

    #[async_trait]
    impl UserStore for DownStore {
        async fn create(&self, _: &NewUser) -> Result<User, StoreError> {
            Err(StoreError::Connection(sqlx::Error::PoolTimedOut))
        }
        async fn list(&self) -> Result<Vec<User>, StoreError> {
            Err(StoreError::Connection(sqlx::Error::PoolTimedOut))
        }
        async fn find_by_id(&self, _: i32) -> Result<User, StoreError> {
            Err(StoreError::Connection(sqlx::Error::PoolClosed))
        }
    }

    #[tokio::test]
    async fn connection_errors_propagate() {
        let svc = UserService::new(Arc::new(DownStore));
        assert!(matches!(
            svc.create(dto("a@x.com", "A")).await,
            Err(ServiceError::Store(StoreError::Connection(_)))
        ));
        assert!(matches!(
            svc.find_all().await,
            Err(ServiceError::Store(StoreError::Connection(_)))
        ));
        assert!(matches!(
            svc.find_one(1).await,
            Err(ServiceError::Store(StoreError::Connection(_)))
        ));
    }
}
