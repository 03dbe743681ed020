//! Auth command handlers and the login view.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Result;
use fbdash_core::api::{ApiClient, ApiError};
use fbdash_core::config::Config;
use fbdash_core::credentials::TokenStore;
use fbdash_core::nav::DASHBOARD_PATH;
use fbdash_core::session::{SessionManager, SessionState};

/// Login view: prompts for credentials on stdin and authenticates.
///
/// Empty inputs are passed through; the server decides what is valid.
/// On success the session token is already persisted by the session
/// manager, and the view navigates on to the dashboard.
pub async fn login_view(session: &SessionManager) -> Result<Option<&'static str>> {
    let username = prompt("Username: ")?;
    let password = prompt("Password: ")?;

    match session.login(&username, &password).await {
        Ok(user) => {
            println!("✓ Logged in as {}", user.username);
            Ok(Some(DASHBOARD_PATH))
        }
        Err(e) => match e.downcast_ref::<ApiError>() {
            Some(ApiError::InvalidCredentials) => {
                anyhow::bail!("Invalid credentials. Check your username and password, then try again.")
            }
            _ => Err(e.context("login failed")),
        },
    }
}

/// Clears the stored session token.
pub async fn logout(config: &Config) -> Result<()> {
    let store = TokenStore::new();
    let had_token = store.load().ok().flatten().is_some();

    let api = Arc::new(ApiClient::from_config(config));
    let session = SessionManager::new(api, store.clone());
    session.logout().await?;

    if had_token {
        println!("✓ Logged out");
        println!("  Credentials removed from: {}", store.path().display());
    } else {
        println!("Not logged in (no credentials found).");
    }
    Ok(())
}

/// Prints the identity the stored token resolves to, if any.
pub async fn whoami(config: &Config) -> Result<()> {
    let api = Arc::new(ApiClient::from_config(config));
    let session = SessionManager::new(api, TokenStore::new());

    session.start().await;

    match session.state() {
        SessionState::Authenticated(user) => {
            println!("Logged in as {} (id {})", user.username, user.id);
            if let Some(email) = user.email {
                println!("  email: {email}");
            }
        }
        _ => println!("Not logged in."),
    }
    Ok(())
}

/// Prompts on stdout and reads one line from stdin.
fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}
