//! User administration.

use anyhow::Result;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use super::access::{print_report, AccessReport, UsageReport};
use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum UserCommands {
    /// List users
    List {
        #[arg(long, default_value = "0")]
        skip: u64,
        #[arg(short, long, default_value = "100")]
        limit: u64,
    },

    /// Show one user
    Get { id: i64 },

    /// Create a user
    Create {
        username: String,
        #[arg(short, long, env = "TOLLBOOTH_NEW_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        admin: bool,
    },

    /// Change a user's password or admin flag
    Update {
        id: i64,
        #[arg(short, long)]
        password: Option<String>,
        #[arg(long)]
        admin: Option<bool>,
    },

    /// Delete a user
    Delete { id: i64 },

    /// Check a user's access to a service without consuming quota
    Access { id: i64, service: String },

    /// Record one unit of usage for a user
    RecordUsage { id: i64, service: String },
}

#[derive(Debug, Deserialize, Serialize)]
struct User {
    id: i64,
    username: String,
    is_admin: bool,
    subscription_plan_id: Option<i64>,
    usage_count: u64,
    created_at: String,
}

#[derive(Debug, Serialize, Tabled)]
struct UserRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Admin")]
    is_admin: bool,
    #[tabled(rename = "Plan")]
    plan: String,
    #[tabled(rename = "Usage")]
    usage_count: u64,
}

impl From<User> for UserRow {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            is_admin: u.is_admin,
            plan: u
                .subscription_plan_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            usage_count: u.usage_count,
        }
    }
}

pub async fn execute(cmd: UserCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        UserCommands::List { skip, limit } => {
            let users: Vec<User> = client
                .get(&format!("/users?skip={}&limit={}", skip, limit))
                .await?;
            let rows: Vec<UserRow> = users.into_iter().map(Into::into).collect();
            output::print_list(&rows, format)?;
        }

        UserCommands::Get { id } => {
            let user: User = client.get(&format!("/users/{}", id)).await?;
            output::print_item(&user, format)?;
        }

        UserCommands::Create {
            username,
            password,
            admin,
        } => {
            let user: User = client
                .post(
                    "/users",
                    &serde_json::json!({
                        "username": username,
                        "password": password,
                        "is_admin": admin,
                    }),
                )
                .await?;
            match format {
                OutputFormat::Table => {
                    output::print_success(&format!("User {} ({}) created", user.id, user.username))
                }
                _ => output::print_item(&user, format)?,
            }
        }

        UserCommands::Update {
            id,
            password,
            admin,
        } => {
            let mut body = serde_json::Map::new();
            if let Some(password) = password {
                body.insert("password".into(), password.into());
            }
            if let Some(admin) = admin {
                body.insert("is_admin".into(), admin.into());
            }
            let user: User = client
                .patch(&format!("/users/{}", id), &serde_json::Value::Object(body))
                .await?;
            output::print_item(&user, format)?;
        }

        UserCommands::Delete { id } => {
            let user: User = client.delete(&format!("/users/{}", id)).await?;
            match format {
                OutputFormat::Table => {
                    output::print_success(&format!("User {} ({}) deleted", user.id, user.username))
                }
                _ => output::print_item(&user, format)?,
            }
        }

        UserCommands::Access { id, service } => {
            let report: AccessReport = client
                .get(&format!("/users/{}/access/{}", id, service))
                .await?;
            print_report(&report, format)?;
        }

        UserCommands::RecordUsage { id, service } => {
            let usage: UsageReport = client
                .post_empty(&format!("/users/{}/usage/{}", id, service))
                .await?;
            match format {
                OutputFormat::Table => output::print_success(&format!(
                    "Recorded {} for user {}: {}",
                    usage.service,
                    id,
                    output::usage(usage.current_usage, usage.limit)
                )),
                _ => output::print_item(&usage, format)?,
            }
        }
    }

    Ok(())
}
