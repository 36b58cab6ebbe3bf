// ABOUTME: Output formatting helpers for scopegate-cli
// ABOUTME: Prints token responses and RFC 6749 error payloads as JSON
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use anyhow::Result;
use scopegate::errors::GrantResult;
use scopegate::models::Agent;
use scopegate::oauth2_server::{AuthenticatedAgent, OAuth2Error, TokenResponse};

/// Print a grant outcome; grant errors are output, not CLI failures
pub fn display_grant_result(result: &GrantResult<TokenResponse>) -> Result<()> {
    match result {
        Ok(response) => println!("{}", serde_json::to_string_pretty(response)?),
        Err(error) => {
            let payload = OAuth2Error::from(error);
            println!("HTTP {}", error.http_status());
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }
    Ok(())
}

/// Display user creation success message
pub fn display_user_created(agent: &Agent) {
    println!("\nUser Created Successfully!");
    println!("{}", "=".repeat(50));
    println!("   Id: {}", agent.id);
    if let Some(username) = &agent.username {
        println!("   Username: {username}");
    }
    if let Some(email) = &agent.email {
        println!("   Email: {email}");
    }
    if agent.scopes.is_empty() {
        println!("   Scopes: (none)");
    } else {
        println!("   Scopes: {}", agent.scopes);
    }
}

/// Display the caller behind an access token
pub fn display_agent(agent: &AuthenticatedAgent) {
    println!("Owner: {} {}", agent.owner.owner_type.as_str(), agent.owner.owner_id);
    println!("Client: {}", agent.client_id);
    println!("Session: {}", agent.session_id);
    println!("Scopes: {}", agent.scopes);
    println!("Expires: {}", agent.expires_at.format("%Y-%m-%d %H:%M:%S UTC"));
}
