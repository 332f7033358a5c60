use anyhow::Result;
use colored::Colorize;

use crate::client::OrderflowClient;

pub async fn status(client: &OrderflowClient, server: &str) -> Result<()> {
    let (code, body) = client.health().await?;
    if code == 200 {
        println!("{} {} is {}", "✓".green(), server.cyan(), "ready".green());
        if !body.is_empty() {
            println!("  {body}");
        }
    } else {
        println!(
            "{} {} returned {} {}",
            "✗".red(),
            server.cyan(),
            code.to_string().red(),
            body
        );
    }
    Ok(())
}
