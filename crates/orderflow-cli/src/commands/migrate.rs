use anyhow::{Context, Result};
use colored::Colorize;
use orderflow_db_postgres::{PostgresConfig, create_pool, mask_password, migrations};

use crate::cli::MigrateCommands;
use crate::output::{print_success, print_warning};

pub async fn run(database_url: &str, command: &MigrateCommands) -> Result<()> {
    let config = PostgresConfig::new(database_url)
        .with_pool_size(1)
        .with_run_migrations(false);
    let pool = create_pool(&config)
        .await
        .with_context(|| format!("Failed to connect to {}", mask_password(database_url)))?;

    match command {
        MigrateCommands::Up => {
            let before = migrations::version(&pool).await?;
            migrations::run(&pool).await?;
            let after = migrations::version(&pool).await?;
            if before == after {
                print_success(&format!("Schema already up to date (version {after})"));
            } else {
                print_success(&format!("Migrated from version {before} to {after}"));
            }
        }
        MigrateCommands::Down { steps } => {
            let reverted = migrations::undo(&pool, *steps).await?;
            if reverted.is_empty() {
                print_warning("No applied migrations to revert");
            }
            for version in reverted {
                print_success(&format!("Reverted {version}"));
            }
        }
        MigrateCommands::Redo => {
            migrations::redo(&pool).await?;
            let version = migrations::version(&pool).await?;
            print_success(&format!("Re-applied version {version}"));
        }
        MigrateCommands::Status => {
            for m in migrations::status(&pool).await? {
                let state = match m.installed_on {
                    Some(at) => format!("applied {}", at.format("%Y-%m-%d %H:%M:%S")).green(),
                    None => "pending".yellow(),
                };
                println!("{} {} {}", m.version.to_string().cyan(), m.description, state);
            }
        }
        MigrateCommands::Version => {
            println!("{}", migrations::version(&pool).await?);
        }
    }

    pool.close().await;
    Ok(())
}
