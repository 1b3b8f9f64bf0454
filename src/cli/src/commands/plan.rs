//! Plan administration.

use anyhow::Result;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum PlanCommands {
    /// List plans
    List {
        #[arg(long, default_value = "0")]
        skip: u64,
        #[arg(short, long, default_value = "100")]
        limit: u64,
    },

    /// Show one plan
    Get { id: i64 },

    /// Create a plan
    Create {
        #[arg(short, long)]
        name: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Comma-separated service names, e.g. "storage,compute"
        #[arg(short, long)]
        services: String,

        /// Successful calls allowed per subscriber
        #[arg(short = 'q', long)]
        usage_limit: u64,
    },

    /// Change some fields of a plan
    Update {
        id: i64,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        services: Option<String>,
        #[arg(short = 'q', long)]
        usage_limit: Option<u64>,
    },

    /// Delete a plan. Subscribers lose their subscription.
    Delete { id: i64 },
}

#[derive(Debug, Deserialize, Serialize)]
struct Plan {
    id: i64,
    name: String,
    description: String,
    allowed_services: String,
    usage_limit: u64,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, Serialize, Tabled)]
struct PlanRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Services")]
    services: String,
    #[tabled(rename = "Limit")]
    usage_limit: u64,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<Plan> for PlanRow {
    fn from(plan: Plan) -> Self {
        Self {
            id: plan.id,
            name: plan.name,
            services: plan.allowed_services,
            usage_limit: plan.usage_limit,
            description: plan.description,
        }
    }
}

#[derive(Serialize)]
struct CreatePlanBody<'a> {
    name: &'a str,
    description: &'a str,
    allowed_services: &'a str,
    usage_limit: u64,
}

#[derive(Serialize, Default)]
struct UpdatePlanBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_services: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage_limit: Option<u64>,
}

fn print_plan(plan: &Plan, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            output::print_header(&format!("Plan {}: {}", plan.id, plan.name));
            output::print_detail("Services", &plan.allowed_services);
            output::print_detail("Usage limit", &plan.usage_limit.to_string());
            output::print_detail("Description", &plan.description);
            output::print_detail("Updated", &plan.updated_at);
            Ok(())
        }
        _ => output::print_item(plan, format),
    }
}

pub async fn execute(cmd: PlanCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        PlanCommands::List { skip, limit } => {
            let plans: Vec<Plan> = client
                .get(&format!("/plans?skip={}&limit={}", skip, limit))
                .await?;
            let rows: Vec<PlanRow> = plans.into_iter().map(PlanRow::from).collect();
            output::print_list(&rows, format)?;
        }

        PlanCommands::Get { id } => {
            let plan: Plan = client.get(&format!("/plans/{}", id)).await?;
            print_plan(&plan, format)?;
        }

        PlanCommands::Create {
            name,
            description,
            services,
            usage_limit,
        } => {
            let body = CreatePlanBody {
                name: &name,
                description: &description,
                allowed_services: &services,
                usage_limit,
            };
            let plan: Plan = client.post("/plans", &body).await?;
            if let OutputFormat::Table = format {
                output::print_success(&format!("Plan {} created", plan.id));
            }
            print_plan(&plan, format)?;
        }

        PlanCommands::Update {
            id,
            name,
            description,
            services,
            usage_limit,
        } => {
            let body = UpdatePlanBody {
                name,
                description,
                allowed_services: services,
                usage_limit,
            };
            let plan: Plan = client.patch(&format!("/plans/{}", id), &body).await?;
            print_plan(&plan, format)?;
        }

        PlanCommands::Delete { id } => {
            let plan: Plan = client.delete(&format!("/plans/{}", id)).await?;
            match format {
                OutputFormat::Table => {
                    output::print_success(&format!("Plan {} ({}) deleted", plan.id, plan.name))
                }
                _ => output::print_item(&plan, format)?,
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_body_omits_unset_fields() {
        let body = UpdatePlanBody {
            usage_limit: Some(50),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&body).unwrap(), serde_json::json!({"usage_limit": 50}));
    }
}
