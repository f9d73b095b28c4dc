//! Live-stream command handlers: `watch` and `average --wait`.

use std::time::Duration;

use owo_colors::OwoColorize;
use tokio::sync::broadcast::error::RecvError;

use devdock_core::{Coordinator, Notice};

use crate::cli::{AverageArgs, GlobalOpts};
use crate::error::CliError;
use crate::output::{print_output, should_color};

/// How long `average --wait` listens for the computed value.
const AVERAGE_WAIT: Duration = Duration::from_secs(60);

/// Stream live events until interrupted.
pub async fn run(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let mut notices = coordinator.notices();
    let color = should_color(&global.color);

    print_output("Watching live events (ctrl-c to stop)", global.quiet);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            result = notices.recv() => {
                match result {
                    Ok(notice) => print_notice(&notice, color, global.quiet),
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "notice stream lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    coordinator.sign_out().await;
    Ok(())
}

/// Queue an average computation; with `--wait`, stay on the live channel
/// until the computed value arrives.
pub async fn average(
    coordinator: &Coordinator,
    args: AverageArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut notices = coordinator.notices();

    let ack = coordinator.request_average(&args.column).await?;
    print_output(&ack, global.quiet);

    if !args.wait {
        return Ok(());
    }

    let wanted = args.column.clone();
    let wait = async {
        loop {
            match notices.recv().await {
                Ok(Notice::AverageComputed { column, average }) if column == wanted => {
                    return Some(average);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return None,
            }
        }
    };

    match tokio::time::timeout(AVERAGE_WAIT, wait).await {
        Ok(Some(average)) => {
            print_output(&format!("Average of {}: {average}", args.column), global.quiet);
            Ok(())
        }
        _ => Err(CliError::ApiError {
            message: format!(
                "no result arrived within {}s -- the value will show up in `devdock watch`",
                AVERAGE_WAIT.as_secs()
            ),
        }),
    }
}

// ── Rendering ───────────────────────────────────────────────────────

fn print_notice(notice: &Notice, color: bool, quiet: bool) {
    let text = notice.to_string();
    if !color {
        print_output(&text, quiet);
        return;
    }

    let line = match notice {
        Notice::DeviceAdded { .. }
        | Notice::DeviceRestored { .. }
        | Notice::HubReconnected => text.green().to_string(),
        Notice::DeviceUpdated { .. } | Notice::AverageComputed { .. } => {
            text.cyan().to_string()
        }
        Notice::DeviceDeleted | Notice::HubDisconnected | Notice::SessionExpired => {
            text.red().to_string()
        }
        Notice::HubReconnecting => text.yellow().to_string(),
        Notice::NotificationReceived { .. } => text.to_string(),
    };
    print_output(&line, quiet);
}
