//! Health check command.

use anyhow::Result;
use clap::Args;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct HealthArgs {}

pub async fn execute(_args: HealthArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health: serde_json::Value = client.get_raw("/health").await?;

    match format {
        OutputFormat::Table => {
            let field = |name: &str| {
                health
                    .get(name)
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
                    .to_string()
            };
            let status = field("status");

            output::print_header("Gateway Health");
            output::print_detail("Status", &status);
            output::print_detail("Storage", &field("storage"));
            output::print_detail("API URL", client.base_url());
            output::print_detail("Version", &field("version"));
            output::print_detail("Timestamp", &field("timestamp"));

            if status == "healthy" {
                output::print_success("Gateway operational");
            } else {
                output::print_error(&format!("Gateway status: {}", status));
            }
        }
        _ => output::print_item(&health, format)?,
    }

    Ok(())
}
