//! Auth command handlers: login, register, logout, whoami.

use dialoguer::Input;
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use devdock_config as cfg;
use devdock_core::{CachedUser, Coordinator};

use crate::cli::{GlobalOpts, LoginArgs, RegisterArgs};
use crate::config::active_profile_name;
use crate::error::CliError;
use crate::output::print_output;

/// Sign in, verify the credentials against the service, and remember them.
pub async fn login(
    coordinator: &Coordinator,
    args: LoginArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let username = match args.username.clone().or_else(|| global.username.clone()) {
        Some(u) => u,
        None => prompt_username()?,
    };

    // Prefer the configured chain; fall back to an interactive prompt.
    let password = match crate::config::resolve_credentials(global) {
        Ok((_, password)) => password,
        Err(_) => prompt_password("Password")?,
    };

    let session = coordinator.sign_in(&username, &password).await?;

    // Remember the display identity and (unless opted out) the password.
    cfg::save_cached_user(&CachedUser::from(&session))?;
    if !args.no_store {
        let profile_name = active_profile_name(global, &cfg::load_config_or_default());
        if let Err(e) = cfg::store_password(&profile_name, password.expose_secret()) {
            warn!(error = %e, "could not store password in keyring");
        }
    }

    print_output(
        &format!("Logged in as {} ({})", session.username, session.role),
        global.quiet,
    );
    Ok(())
}

/// Create a new account. Self-registration gets the User role.
pub async fn register(
    coordinator: &Coordinator,
    args: RegisterArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let username = match args.username {
        Some(u) => u,
        None => prompt_username()?,
    };

    let password = prompt_password("Password")?;
    let confirmed = prompt_password("Confirm password")?;
    if password.expose_secret() != confirmed.expose_secret() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "passwords do not match".into(),
        });
    }

    let message = coordinator.register(&username, &password).await?;
    print_output(&message, global.quiet);
    Ok(())
}

/// End the server session (best-effort) and forget the remembered user.
pub async fn logout(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    // A server-side logout needs a session; skip it when no credentials
    // are configured and just drop the local record.
    match crate::config::resolve_credentials(global) {
        Ok((username, password)) => {
            if let Err(e) = coordinator.sign_in(&username, &password).await {
                warn!(error = %e, "could not establish a session to log out of");
            } else {
                coordinator.sign_out().await;
            }
        }
        Err(e) => warn!(error = %e, "no credentials -- clearing local state only"),
    }

    cfg::clear_cached_user()?;
    print_output("Logged out", global.quiet);
    Ok(())
}

/// Show the remembered user.
pub fn whoami(global: &GlobalOpts) -> Result<(), CliError> {
    let user = cfg::load_cached_user().ok_or(CliError::NotSignedIn)?;
    print_output(&format!("{} ({})", user.username, user.role), global.quiet);
    Ok(())
}

// ── Prompts ─────────────────────────────────────────────────────────

fn prompt_username() -> Result<String, CliError> {
    let mut input = Input::new().with_prompt("Username");
    if let Some(cached) = cfg::load_cached_user() {
        input = input.default(cached.username);
    }
    input
        .interact_text()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

fn prompt_password(prompt: &str) -> Result<SecretString, CliError> {
    let raw = rpassword::prompt_password(format!("{prompt}: "))?;
    Ok(SecretString::from(raw))
}
