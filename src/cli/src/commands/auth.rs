//! Login, logout and whoami.

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use super::config::{self, TOKEN_KEY};
use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct LoginArgs {
    /// Account name
    #[arg(short, long)]
    username: String,

    /// Password; read from TOLLBOOTH_PASSWORD when omitted
    #[arg(short, long, env = "TOLLBOOTH_PASSWORD", hide_env_values = true)]
    password: String,

    /// Print the token instead of saving it
    #[arg(long)]
    print: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Me {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
    pub subscription_plan_id: Option<i64>,
    pub usage_count: u64,
}

pub async fn login(args: LoginArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let token = client.login(&args.username, &args.password).await?;

    if args.print {
        return match format {
            OutputFormat::Table => {
                println!("{}", token.access_token);
                Ok(())
            }
            _ => output::print_item(&token, format),
        };
    }

    config::store_value(TOKEN_KEY, Some(token.access_token))
        .context("Failed to save token")?;
    output::print_success(&format!(
        "Logged in as {} (token valid for {}s)",
        args.username, token.expires_in
    ));
    Ok(())
}

pub async fn logout() -> Result<()> {
    config::store_value(TOKEN_KEY, None)?;
    output::print_success("Stored token removed");
    Ok(())
}

pub async fn whoami(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let me: Me = client.get("/me").await?;

    match format {
        OutputFormat::Table => {
            output::print_header(&me.username);
            output::print_detail("ID", &me.id.to_string());
            output::print_detail("Admin", &me.is_admin.to_string());
            output::print_detail(
                "Plan",
                &me.subscription_plan_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "none".to_string()),
            );
            output::print_detail("Usage", &me.usage_count.to_string());
        }
        _ => output::print_item(&me, format)?,
    }
    Ok(())
}
