mod cli;
mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use client::OrderflowClient;
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Migrate(args) => {
            commands::migrate::run(&args.database_url, &args.command).await?;
        }
        Commands::Get(args) => {
            let client = OrderflowClient::new(&cli.server);
            commands::order::get(&client, &args.order_uid).await?;
        }
        Commands::Publish(args) => {
            let client = OrderflowClient::new(&cli.server);
            match args.sample {
                Some(count) => commands::order::publish_samples(&client, count).await?,
                None => commands::order::publish_files(&client, &args.files).await?,
            }
        }
        Commands::Status => {
            let client = OrderflowClient::new(&cli.server);
            commands::server::status(&client, &cli.server).await?;
        }
    }

    Ok(())
}
