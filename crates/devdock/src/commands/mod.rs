//! Command handlers.

pub mod auth;
pub mod config_cmd;
pub mod devices;
pub mod notifications;
pub mod util;
pub mod watch;

use devdock_core::Coordinator;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a parsed command to its handler.
pub async fn dispatch(
    cmd: Command,
    coordinator: &Coordinator,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => auth::login(coordinator, args, global).await,
        Command::Register(args) => auth::register(coordinator, args, global).await,
        Command::Logout => auth::logout(coordinator, global).await,

        Command::Devices(args) => {
            util::ensure_session(coordinator, global).await?;
            devices::handle(coordinator, args, global).await
        }
        Command::Notifications(args) => {
            util::ensure_session(coordinator, global).await?;
            notifications::handle(coordinator, args, global).await
        }
        Command::Average(args) => {
            util::ensure_session(coordinator, global).await?;
            watch::average(coordinator, args, global).await
        }
        Command::Watch => {
            util::ensure_session(coordinator, global).await?;
            watch::run(coordinator, global).await
        }

        // Handled before dispatch.
        Command::Config(_) | Command::Whoami | Command::Completions(_) => unreachable!(),
    }
}
