//! Throwaway Postgres schemas for database tests
//!
//! Each `TestDb` gets its own schema on the `DATABASE_URL` server and a
//! pool whose `search_path` points at it, so tests never see each
//! other's tables or indexes.

use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

pub(crate) struct TestDb {
    pub pool: PgPool,
    schema: String,
    url: String,
}

impl TestDb {
    pub async fn new() -> Self {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let schema = format!("userctl_test_{}", uuid::Uuid::new_v4().simple());

        let admin = PgPool::connect(&url).await.expect("admin connect failed");
        sqlx::query(&format!("CREATE SCHEMA {schema}"))
            .execute(&admin)
            .await
            .expect("create schema failed");
        admin.close().await;

        let options = PgConnectOptions::from_str(&url)
            .expect("invalid DATABASE_URL")
            .options([("search_path", schema.as_str())]);
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .expect("pool creation failed");

        Self { pool, schema, url }
    }

    pub async fn teardown(self) {
        self.pool.close().await;
        let admin = PgPool::connect(&self.url).await.expect("admin connect failed");
        sqlx::query(&format!("DROP SCHEMA {} CASCADE", self.schema))
            .execute(&admin)
            .await
            .expect("drop schema failed");
        admin.close().await;
    }
}
