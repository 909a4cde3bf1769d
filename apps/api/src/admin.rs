//! Operational commands against the identity provider, used by `provider-admin`.

use std::io::Write;

use anyhow::{bail, Context, Result};

use crate::provider::{IdentityProvider, NewProviderUser, ProviderUser};

pub const TEST_USER_PASSWORD: &str = "testpassword123";
pub const TEST_USER_DISPLAY_NAME: &str = "Test User";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    List { max_results: u32 },
    Create {
        email: String,
        password: String,
        display_name: String,
    },
    Delete { uid: String },
}

/// Runs one command, writing a human-readable report to `out`.
pub async fn run(
    provider: &dyn IdentityProvider,
    command: AdminCommand,
    out: &mut impl Write,
) -> Result<()> {
    if !provider.is_available() {
        bail!("Identity provider is not initialized. Check your credentials.");
    }

    match command {
        AdminCommand::List { max_results } => {
            writeln!(out, "Fetching identity provider users...")?;
            let users = provider
                .list_users(max_results)
                .await
                .context("Failed to list users")?;
            if users.is_empty() {
                writeln!(out, "No identity provider users found.")?;
                return Ok(());
            }
            writeln!(out, "Found {} identity provider users:", users.len())?;
            for user in &users {
                write_user(out, user)?;
            }
        }
        AdminCommand::Create {
            email,
            password,
            display_name,
        } => {
            writeln!(out, "Creating test user: {email}")?;
            let created = provider
                .create_user(&NewProviderUser {
                    email,
                    password,
                    display_name: Some(display_name),
                })
                .await
                .context("Failed to create user")?;
            writeln!(out, "User created successfully!")?;
            writeln!(out, "  UID: {}", created.uid)?;
            writeln!(out, "  Email: {}", created.email.as_deref().unwrap_or("N/A"))?;
            writeln!(
                out,
                "  Display Name: {}",
                created.display_name.as_deref().unwrap_or("N/A")
            )?;
        }
        AdminCommand::Delete { uid } => {
            writeln!(out, "Deleting user: {uid}")?;
            provider
                .delete_user(&uid)
                .await
                .with_context(|| format!("Failed to delete user {uid}"))?;
            writeln!(out, "User {uid} deleted successfully!")?;
        }
    }
    Ok(())
}

fn write_user(out: &mut impl Write, user: &ProviderUser) -> std::io::Result<()> {
    writeln!(out, "  UID: {}", user.uid)?;
    writeln!(out, "    Email: {}", user.email.as_deref().unwrap_or("N/A"))?;
    writeln!(
        out,
        "    Display Name: {}",
        user.display_name.as_deref().unwrap_or("N/A")
    )?;
    writeln!(out, "    Email Verified: {}", user.email_verified)?;
    writeln!(out, "    Disabled: {}", user.disabled)?;
    match user.created_at {
        Some(created_at) => writeln!(out, "    Created: {}", created_at.to_rfc3339())?,
        None => writeln!(out, "    Created: N/A")?,
    }
    writeln!(out, "    ---")
}
