//! Tollbooth CLI - command-line client for the Tollbooth access gateway.
//!
//! Log in once with `tollbooth login`; the token is kept in the local
//! config file and sent as a bearer credential on later calls.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::config::{API_URL_KEY, TOKEN_KEY};
use commands::{access, auth, config, health, permission, plan, user};
use output::OutputFormat;

/// Tollbooth - subscription plans and service access gating
#[derive(Parser)]
#[command(
    name = "tollbooth",
    version,
    about = "Tollbooth - subscription plans and service access gating",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// API server URL
    #[arg(long, global = true, env = "TOLLBOOTH_API_URL")]
    api_url: Option<String>,

    /// Bearer token; overrides the stored one
    #[arg(long, global = true, env = "TOLLBOOTH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Obtain a token and store it
    Login(auth::LoginArgs),

    /// Forget the stored token
    Logout,

    /// Show the current user
    Whoami,

    /// Subscribe to a plan
    Subscribe {
        plan_id: i64,
    },

    /// Drop the current subscription
    Unsubscribe,

    /// Call a service once, consuming quota when granted
    Use {
        service: String,
    },

    /// Check access to a service without consuming quota
    Check {
        service: String,
    },

    /// Plan administration
    #[command(subcommand)]
    Plan(plan::PlanCommands),

    /// Permission administration
    #[command(subcommand)]
    Permission(permission::PermissionCommands),

    /// User administration
    #[command(subcommand)]
    User(user::UserCommands),

    /// Check gateway health
    Health(health::HealthArgs),

    /// Local CLI configuration
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let api_url = cli
        .api_url
        .clone()
        .or_else(|| config::load_value(API_URL_KEY))
        .unwrap_or_else(|| "http://localhost:8080".to_string());
    let token = cli.token.clone().or_else(|| config::load_value(TOKEN_KEY));

    let client = client::ApiClient::new(&api_url, token)?;
    let format = cli.output;

    let result = match cli.command {
        Commands::Login(args) => auth::login(args, &client, format).await,
        Commands::Logout => auth::logout().await,
        Commands::Whoami => auth::whoami(&client, format).await,
        Commands::Subscribe { plan_id } => access::subscribe(plan_id, &client, format).await,
        Commands::Unsubscribe => access::unsubscribe(&client, format).await,
        Commands::Use { service } => access::use_service(&service, &client, format).await,
        Commands::Check { service } => access::check(&service, &client, format).await,
        Commands::Plan(cmd) => plan::execute(cmd, &client, format).await,
        Commands::Permission(cmd) => permission::execute(cmd, &client, format).await,
        Commands::User(cmd) => user::execute(cmd, &client, format).await,
        Commands::Health(args) => health::execute(args, &client, format).await,
        Commands::Config(cmd) => config::execute(cmd, format).await,
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
