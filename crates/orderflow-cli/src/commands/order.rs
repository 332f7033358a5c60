use std::fs;

use anyhow::{Context, Result};
use colored::Colorize;
use orderflow_core::sample::sample_payload;

use crate::client::OrderflowClient;
use crate::output::{print_success, print_value};

pub async fn get(client: &OrderflowClient, order_uid: &str) -> Result<()> {
    match client.get_order(order_uid).await? {
        Some(lookup) => {
            if let Some(cache) = &lookup.cache {
                eprintln!("{}: {}", "X-Cache".cyan(), cache);
            }
            print_value(&lookup.body);
            Ok(())
        }
        None => anyhow::bail!("Order {order_uid} not found"),
    }
}

pub async fn publish_files(client: &OrderflowClient, files: &[String]) -> Result<()> {
    for path in files {
        let payload = fs::read(path).with_context(|| format!("Failed to read {path}"))?;
        let receipt = client.publish(payload).await?;
        print_success(&format!(
            "{path} -> {}@{}",
            receipt.topic, receipt.offset
        ));
    }
    Ok(())
}

pub async fn publish_samples(client: &OrderflowClient, count: usize) -> Result<()> {
    for _ in 0..count {
        let order_uid = sample_order_uid();
        let receipt = client.publish(sample_payload(&order_uid)).await?;
        print_success(&format!(
            "{order_uid} -> {}@{}",
            receipt.topic, receipt.offset
        ));
    }
    Ok(())
}

/// Identifier that satisfies the letters-and-digits rule.
fn sample_order_uid() -> String {
    format!("SAMPLE{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_order_uid_is_alphanumeric() {
        let uid = sample_order_uid();
        assert!(uid.len() <= 64);
        assert!(uid.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(uid, sample_order_uid());
    }
}
