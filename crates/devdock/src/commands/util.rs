//! Shared helpers for command handlers.

use dialoguer::Confirm;

use devdock_core::Coordinator;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Sign in with the resolved credential chain. Every service-backed
/// command runs inside a fresh one-shot session.
pub async fn ensure_session(
    coordinator: &Coordinator,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (username, password) = crate::config::resolve_credentials(global)?;
    coordinator.sign_in(&username, &password).await?;
    Ok(())
}

/// Ask the user to confirm a destructive action.
///
/// `--yes` skips the prompt; in a non-interactive context without `--yes`
/// the action is refused rather than silently performed.
pub fn confirm(prompt: &str, global: &GlobalOpts, action: &str) -> Result<bool, CliError> {
    if global.yes {
        return Ok(true);
    }

    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.to_owned(),
        });
    }

    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}
