use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "orderflow")]
#[command(about = "Orderflow CLI: schema migrations, order lookup and publishing")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Service base URL
    #[arg(
        short,
        long,
        global = true,
        env = "ORDERFLOW_URL",
        default_value = "http://localhost:8081"
    )]
    pub server: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the PostgreSQL schema
    Migrate(MigrateArgs),
    /// Look up an order by id
    Get(GetArgs),
    /// Publish orders to the service's stream
    Publish(PublishArgs),
    /// Check service health
    Status,
}

#[derive(clap::Args)]
pub struct MigrateArgs {
    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    #[command(subcommand)]
    pub command: MigrateCommands,
}

#[derive(Subcommand)]
pub enum MigrateCommands {
    /// Apply all pending migrations
    Up,
    /// Revert the most recent migrations
    Down {
        /// Number of migrations to revert
        #[arg(default_value_t = 1)]
        steps: usize,
    },
    /// Revert and re-apply the most recent migration
    Redo,
    /// List embedded migrations and whether they are applied
    Status,
    /// Print the current schema version
    Version,
}

#[derive(clap::Args)]
pub struct GetArgs {
    /// Order identifier (order_uid)
    pub order_uid: String,
}

#[derive(clap::Args)]
pub struct PublishArgs {
    /// JSON files, one order per file
    #[arg(required_unless_present = "sample", conflicts_with = "sample")]
    pub files: Vec<String>,

    /// Publish this many generated sample orders instead of files
    #[arg(long)]
    pub sample: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_migrate_down_default_steps() {
        let cli = Cli::try_parse_from([
            "orderflow",
            "migrate",
            "--database-url",
            "postgres://localhost/orderflow",
            "down",
        ])
        .unwrap();
        match cli.command {
            Commands::Migrate(args) => {
                assert_eq!(args.database_url, "postgres://localhost/orderflow");
                assert!(matches!(args.command, MigrateCommands::Down { steps: 1 }));
            }
            _ => panic!("expected migrate"),
        }
    }

    #[test]
    fn test_publish_requires_files_or_sample() {
        assert!(Cli::try_parse_from(["orderflow", "publish"]).is_err());
        assert!(Cli::try_parse_from(["orderflow", "publish", "a.json", "--sample", "2"]).is_err());

        let cli = Cli::try_parse_from(["orderflow", "publish", "--sample", "3"]).unwrap();
        match cli.command {
            Commands::Publish(args) => {
                assert_eq!(args.sample, Some(3));
                assert!(args.files.is_empty());
            }
            _ => panic!("expected publish"),
        }
    }

    #[test]
    fn test_server_flag_is_global() {
        let cli =
            Cli::try_parse_from(["orderflow", "get", "ORDER1", "--server", "http://svc:9000"])
                .unwrap();
        assert_eq!(cli.server, "http://svc:9000");
    }
}
