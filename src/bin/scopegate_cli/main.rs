// ABOUTME: Scopegate CLI - command-line tool for managing the grant store and exercising grants
// ABOUTME: Handles scope, client, and user registration plus password, refresh, and revocation commands
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//!
//! Usage:
//! ```bash
//! # Register scopes
//! scopegate-cli scope create --id user --description "User access"
//! scopegate-cli scope create --id admin --description "Administration" --grant password
//!
//! # Register a client
//! scopegate-cli client create --id client1 --secret client1secret --name "Client One" \
//!     --scope user --scope admin --grant password --grant refresh_token
//!
//! # Register a user
//! scopegate-cli user create --username aNewTestUser --password aUserPassword --scope user --scope admin
//!
//! # Password grant
//! scopegate-cli token password --client-id client1 --client-secret client1secret \
//!     --username aNewTestUser --password aUserPassword --scope user,admin
//!
//! # Refresh grant
//! scopegate-cli token refresh --client-id client1 --client-secret client1secret --refresh-token <token>
//!
//! # Revoke every session of a user
//! scopegate-cli token revoke-user --user-id <uuid>
//! ```

mod commands;
mod helpers;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use scopegate::config::{DatabaseConfig, GrantServerConfig};
use scopegate::database_plugins::SqliteStore;
use scopegate::logging::LoggingConfig;
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "scopegate-cli",
    about = "Scopegate Management CLI",
    long_about = "Command-line tool for registering scopes, clients, and users and for running OAuth 2.0 password and refresh token grants."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Database URL override
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Scope catalog commands
    Scope {
        #[command(subcommand)]
        action: ScopeCommand,
    },

    /// Client registration commands
    Client {
        #[command(subcommand)]
        action: ClientCommand,
    },

    /// User management commands
    User {
        #[command(subcommand)]
        action: UserCommand,
    },

    /// Grant and token commands
    Token {
        #[command(subcommand)]
        action: TokenCommand,
    },
}

#[derive(Subcommand)]
enum ScopeCommand {
    /// Register a scope
    Create {
        /// Scope id as used in requests
        #[arg(long)]
        id: String,

        /// Human-readable description
        #[arg(long)]
        description: String,

        /// Grants allowed to issue this scope (repeatable)
        #[arg(long = "grant")]
        grants: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ClientCommand {
    /// Register a client
    Create {
        /// Client id
        #[arg(long)]
        id: String,

        /// Client secret (stored hashed)
        #[arg(long)]
        secret: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// Scopes the client may request (repeatable)
        #[arg(long = "scope")]
        scopes: Vec<String>,

        /// Grants the client may use (repeatable)
        #[arg(long = "grant")]
        grants: Vec<String>,
    },
}

#[derive(Subcommand)]
enum UserCommand {
    /// Create a user
    Create {
        /// Login name
        #[arg(long)]
        username: Option<String>,

        /// Email address
        #[arg(long)]
        email: Option<String>,

        /// Password (stored hashed)
        #[arg(long)]
        password: String,

        /// Scopes the user may be granted (repeatable)
        #[arg(long = "scope")]
        scopes: Vec<String>,
    },

    /// Generate a password reset token
    ResetToken {
        /// User id
        #[arg(long)]
        user_id: Uuid,
    },

    /// Change a password with a reset token
    ChangePassword {
        /// User id
        #[arg(long)]
        user_id: Uuid,

        /// Reset token from `user reset-token`
        #[arg(long)]
        token: String,

        /// New password
        #[arg(long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum TokenCommand {
    /// Run a password grant
    Password {
        /// Client id
        #[arg(long)]
        client_id: String,

        /// Client secret
        #[arg(long)]
        client_secret: String,

        /// Username
        #[arg(long)]
        username: Option<String>,

        /// Email
        #[arg(long)]
        email: Option<String>,

        /// Password
        #[arg(long)]
        password: String,

        /// Requested scopes, delimiter-separated
        #[arg(long)]
        scope: Option<String>,
    },

    /// Run a refresh token grant
    Refresh {
        /// Client id
        #[arg(long)]
        client_id: String,

        /// Client secret
        #[arg(long)]
        client_secret: String,

        /// Refresh token
        #[arg(long)]
        refresh_token: String,

        /// Requested scopes, delimiter-separated
        #[arg(long)]
        scope: Option<String>,
    },

    /// Show the caller behind an access token
    Inspect {
        /// Access token
        #[arg(long)]
        access_token: String,
    },

    /// Expire one access token
    Expire {
        /// Access token
        #[arg(long)]
        access_token: String,
    },

    /// Expire every token of every session of a user
    RevokeUser {
        /// User id
        #[arg(long)]
        user_id: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env();
    if cli.verbose {
        "debug".clone_into(&mut logging.level);
    }
    logging.init()?;

    info!("Scopegate CLI");

    let database_url = cli
        .database_url
        .unwrap_or_else(|| DatabaseConfig::from_env().url);
    let config = GrantServerConfig::from_env()?;
    config.validate()?;

    info!("Connecting to database: {}", database_url);
    let store = Arc::new(SqliteStore::new(&database_url, config.restrictions()).await?);

    match cli.command {
        Command::Scope { action } => match action {
            ScopeCommand::Create {
                id,
                description,
                grants,
            } => commands::scope::create(&store, id, description, &grants).await?,
        },
        Command::Client { action } => match action {
            ClientCommand::Create {
                id,
                secret,
                name,
                scopes,
                grants,
            } => {
                commands::client::create(&store, id, &secret, name, scopes, &grants).await?;
            }
        },
        Command::User { action } => match action {
            UserCommand::Create {
                username,
                email,
                password,
                scopes,
            } => commands::user::create(&store, username, email, &password, scopes).await?,
            UserCommand::ResetToken { user_id } => {
                commands::user::reset_token(&store, config, user_id).await?;
            }
            UserCommand::ChangePassword {
                user_id,
                token,
                password,
            } => {
                commands::user::change_password(&store, config, user_id, &token, &password)
                    .await?;
            }
        },
        Command::Token { action } => match action {
            TokenCommand::Password {
                client_id,
                client_secret,
                username,
                email,
                password,
                scope,
            } => {
                commands::token::password(
                    &store,
                    config,
                    commands::token::PasswordGrantArgs {
                        client_id,
                        client_secret,
                        username,
                        email,
                        password,
                        scope,
                    },
                )
                .await?;
            }
            TokenCommand::Refresh {
                client_id,
                client_secret,
                refresh_token,
                scope,
            } => {
                commands::token::refresh(
                    &store,
                    config,
                    client_id,
                    client_secret,
                    refresh_token,
                    scope,
                )
                .await?;
            }
            TokenCommand::Inspect { access_token } => {
                commands::token::inspect(&store, config, &access_token).await?;
            }
            TokenCommand::Expire { access_token } => {
                commands::token::expire(&store, config, &access_token).await?;
            }
            TokenCommand::RevokeUser { user_id } => {
                commands::token::revoke_user(&store, config, user_id).await?;
            }
        },
    }

    Ok(())
}
