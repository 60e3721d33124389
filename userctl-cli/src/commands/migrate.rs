//! Schema migration commands
//!
//! `userctl migrate up` applies the next pending migration (or all of
//! them with `--all`), `down` reverts the latest applied one, and
//! `status` lists every migration with its applied time.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use userctl_server::db::{create_pool, MigrationStatus};
use userctl_server::{DbConfig, Migrator};

#[derive(Args, Debug)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub command: MigrateCommands,
}

#[derive(Subcommand, Debug)]
pub enum MigrateCommands {
    /// Apply the next pending migration
    Up {
        /// Apply every pending migration instead of just the next one
        #[arg(long)]
        all: bool,
    },
    /// Revert the most recently applied migration
    Down,
    /// Show applied and pending migrations
    Status,
}

pub async fn run_migrate(args: MigrateArgs) -> Result<()> {
    let db_config = DbConfig::from_env().context("Invalid database configuration")?;
    let pool = create_pool(&db_config)
        .await
        .context("Failed to create database pool")?;
    let migrator = Migrator::new(&pool);

    let result = match args.command {
        MigrateCommands::Up { all: true } => migrator
            .run_pending()
            .await
            .map(|applied| {
                if applied.is_empty() {
                    println!("No pending migrations");
                }
                for name in applied {
                    println!("Applied {}", name);
                }
            }),
        MigrateCommands::Up { all: false } => migrator.up().await.map(|applied| match applied {
            Some(name) => println!("Applied {}", name),
            None => println!("No pending migrations"),
        }),
        MigrateCommands::Down => migrator.down().await.map(|reverted| match reverted {
            Some(name) => println!("Reverted {}", name),
            None => println!("No applied migrations"),
        }),
        MigrateCommands::Status => migrator
            .status()
            .await
            .map(|statuses| print!("{}", render_status(&statuses))),
    };

    pool.close().await;
    result.context("Migration failed")
}

fn render_status(statuses: &[MigrationStatus]) -> String {
    let width = statuses.iter().map(|s| s.name.len()).max().unwrap_or(0);
    statuses
        .iter()
        .map(|s| {
            let state = match s.applied_at {
                Some(at) => format!("applied {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
                None => "pending".to_string(),
            };
            format!("{:<width$}  {}\n", s.name, state, width = width)
        })
        .collect()
}
