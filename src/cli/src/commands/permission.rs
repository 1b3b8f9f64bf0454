//! Permission administration.

use anyhow::Result;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum PermissionCommands {
    /// List permissions
    List {
        #[arg(long, default_value = "0")]
        skip: u64,
        #[arg(short, long, default_value = "100")]
        limit: u64,
    },

    /// Show one permission
    Get { id: i64 },

    /// Register a permission name
    Create {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Rename a permission or change its description
    Update {
        id: i64,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long, conflicts_with = "clear_description")]
        description: Option<String>,
        /// Remove the description
        #[arg(long)]
        clear_description: bool,
    },

    /// Delete a permission
    Delete { id: i64 },
}

#[derive(Debug, Deserialize, Serialize)]
struct Permission {
    id: i64,
    name: String,
    description: Option<String>,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, Serialize, Tabled)]
struct PermissionRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<Permission> for PermissionRow {
    fn from(p: Permission) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description.unwrap_or_default(),
        }
    }
}

/// Build the PATCH body. An explicit `null` clears the description.
fn update_body(
    name: Option<String>,
    description: Option<String>,
    clear_description: bool,
) -> serde_json::Value {
    let mut body = serde_json::Map::new();
    if let Some(name) = name {
        body.insert("name".into(), name.into());
    }
    if clear_description {
        body.insert("description".into(), serde_json::Value::Null);
    } else if let Some(description) = description {
        body.insert("description".into(), description.into());
    }
    serde_json::Value::Object(body)
}

pub async fn execute(
    cmd: PermissionCommands,
    client: &ApiClient,
    format: OutputFormat,
) -> Result<()> {
    match cmd {
        PermissionCommands::List { skip, limit } => {
            let permissions: Vec<Permission> = client
                .get(&format!("/permissions?skip={}&limit={}", skip, limit))
                .await?;
            let rows: Vec<PermissionRow> = permissions.into_iter().map(Into::into).collect();
            output::print_list(&rows, format)?;
        }

        PermissionCommands::Get { id } => {
            let permission: Permission = client.get(&format!("/permissions/{}", id)).await?;
            output::print_item(&permission, format)?;
        }

        PermissionCommands::Create { name, description } => {
            let permission: Permission = client
                .post(
                    "/permissions",
                    &serde_json::json!({ "name": name, "description": description }),
                )
                .await?;
            match format {
                OutputFormat::Table => output::print_success(&format!(
                    "Permission {} ({}) created",
                    permission.id, permission.name
                )),
                _ => output::print_item(&permission, format)?,
            }
        }

        PermissionCommands::Update {
            id,
            name,
            description,
            clear_description,
        } => {
            let body = update_body(name, description, clear_description);
            let permission: Permission =
                client.patch(&format!("/permissions/{}", id), &body).await?;
            output::print_item(&permission, format)?;
        }

        PermissionCommands::Delete { id } => {
            let permission: Permission = client.delete(&format!("/permissions/{}", id)).await?;
            match format {
                OutputFormat::Table => output::print_success(&format!(
                    "Permission {} ({}) deleted",
                    permission.id, permission.name
                )),
                _ => output::print_item(&permission, format)?,
            }
        }
    }

    Ok(())
}
