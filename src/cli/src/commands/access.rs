//! Subscriptions and service calls for the logged-in user.

use anyhow::Result;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, ApiError};
use crate::output::{self, OutputFormat};

#[derive(Debug, Deserialize, Serialize)]
pub struct AccessReport {
    pub service: String,
    pub has_access: bool,
    pub current_usage: u64,
    pub limit: u64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UsageReport {
    pub service: String,
    pub current_usage: u64,
    pub limit: u64,
}

#[derive(Debug, Deserialize, Serialize)]
struct Subscription {
    user_id: i64,
    plan_id: i64,
    plan_name: String,
    usage_count: u64,
    usage_limit: u64,
}

#[derive(Debug, Deserialize, Serialize)]
struct ServiceGrant {
    service: String,
    granted: bool,
    current_usage: u64,
    limit: u64,
}

pub fn print_report(report: &AccessReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            let usage = output::usage(report.current_usage, report.limit);
            if report.has_access {
                output::print_success(&format!("{} allowed ({})", report.service, usage));
            } else {
                let reason = report.reason.as_deref().unwrap_or_default();
                output::print_denied(&format!("{}: {} ({})", report.service, reason, usage));
            }
            Ok(())
        }
        _ => output::print_item(report, format),
    }
}

pub async fn subscribe(plan_id: i64, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let subscription: Subscription = client
        .post("/me/subscription", &serde_json::json!({ "plan_id": plan_id }))
        .await?;

    match format {
        OutputFormat::Table => output::print_success(&format!(
            "Subscribed to {} (plan {}), usage {}",
            subscription.plan_name,
            subscription.plan_id,
            output::usage(subscription.usage_count, subscription.usage_limit)
        )),
        _ => output::print_item(&subscription, format)?,
    }
    Ok(())
}

pub async fn unsubscribe(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let me: serde_json::Value = client.delete("/me/subscription").await?;
    match format {
        OutputFormat::Table => output::print_success("Subscription removed"),
        _ => output::print_item(&me, format)?,
    }
    Ok(())
}

pub async fn check(service: &str, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let report: AccessReport = client.get(&format!("/services/{}/access", service)).await?;
    print_report(&report, format)
}

/// Call a service once. A 403 denial is reported, not treated as a failure.
pub async fn use_service(service: &str, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: Result<ServiceGrant> = client.post_empty(&format!("/services/{}", service)).await;

    match result {
        Ok(grant) => match format {
            OutputFormat::Table => output::print_success(&format!(
                "{} granted ({})",
                grant.service,
                output::usage(grant.current_usage, grant.limit)
            )),
            _ => output::print_item(&grant, format)?,
        },
        Err(err) => {
            let denial = err
                .downcast_ref::<ApiError>()
                .filter(|api| api.status == StatusCode::FORBIDDEN)
                .and_then(|api| api.reason.clone());
            let Some(reason) = denial else {
                return Err(err);
            };

            match format {
                OutputFormat::Table => output::print_denied(&format!("{}: {}", service, reason)),
                _ => output::print_item(
                    &serde_json::json!({
                        "service": service,
                        "granted": false,
                        "reason": reason,
                    }),
                    format,
                )?,
            }
        }
    }
    Ok(())
}
