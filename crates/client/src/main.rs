// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::error;

use parkbnb_client::api::auth::{SignupRequest, SignupRole};
use parkbnb_client::api::profile::{PasswordChange, ProfileUpdate};
use parkbnb_client::error::ErrorResponse;
use parkbnb_client::{ApiClient, ApiError, ClientConfig};

/// Command-line client for the parkbnb marketplace API.
#[derive(Debug, Parser)]
#[command(name = "parkbnb", version, about)]
struct Cli {
    #[command(flatten)]
    client: ClientConfig,

    /// Log format (json or text).
    #[arg(long, env = "PARKBNB_LOG_FORMAT", default_value = "text")]
    log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "PARKBNB_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and persist the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PARKBNB_PASSWORD")]
        password: String,
    },
    /// Register a new account.
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long, env = "PARKBNB_PASSWORD")]
        password: String,
        #[arg(long)]
        confirm_password: String,
        #[arg(long)]
        phone_number: Option<String>,
        /// owner or motorist.
        #[arg(long, default_value = "motorist")]
        role: SignupRole,
    },
    /// Show the persisted session's user and dashboard.
    Whoami,
    /// Fetch the profile from the server.
    Profile,
    /// Update profile fields; only changed fields are sent.
    UpdateProfile {
        #[arg(long)]
        firstname: Option<String>,
        #[arg(long)]
        middlename: Option<String>,
        #[arg(long)]
        lastname: Option<String>,
        #[arg(long)]
        phone_number: Option<String>,
    },
    ChangePassword {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
        #[arg(long)]
        confirm: String,
    },
    /// Clear the persisted session.
    Logout,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<ApiError>() {
            Some(api) => print_json(&ErrorResponse::from(api)),
            None => error!("fatal: {e:#}"),
        }
        std::process::exit(1);
    }
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    match cli.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = ApiClient::open(cli.client)?;

    match cli.command {
        Command::Login { email, password } => {
            let user = client.login(&email, &password).await?;
            let session = client.session().await;
            print_json(&serde_json::json!({
                "user": user,
                "dashboard": session.dashboard_route(),
            }));
        }
        Command::Signup { email, username, password, confirm_password, phone_number, role } => {
            let req = SignupRequest {
                first_name: username.clone(),
                last_name: username.clone(),
                email,
                username,
                password,
                confirm_password,
                phone_number,
                role,
            };
            print_json(&client.signup(&req).await?);
        }
        Command::Whoami => {
            let session = client.session().await;
            if !session.is_authenticated {
                anyhow::bail!("not logged in");
            }
            print_json(&serde_json::json!({
                "user": session.user,
                "dashboard": session.dashboard_route(),
            }));
        }
        Command::Profile => {
            print_json(&client.profile().await?);
        }
        Command::UpdateProfile { firstname, middlename, lastname, phone_number } => {
            let update = ProfileUpdate { firstname, middlename, lastname, phone_number };
            print_json(&client.update_profile(&update).await?);
        }
        Command::ChangePassword { current, new, confirm } => {
            let change = PasswordChange {
                current_password: current,
                new_password: new,
                confirm_password: confirm,
            };
            print_json(&client.change_password(&change).await?);
        }
        Command::Logout => {
            client.logout().await;
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => error!("failed to encode output: {e}"),
    }
}
