//! Notification command handlers.

use chrono::Local;
use tabled::Tabled;

use devdock_core::{Coordinator, Notification};

use crate::cli::{
    GlobalOpts, NotificationIdArg, NotificationsArgs, NotificationsCommand, NotificationsListArgs,
};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct NotificationRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = " ")]
    marker: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "When")]
    when: String,
}

impl From<&Notification> for NotificationRow {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id,
            marker: if n.read { " " } else { "*" }.into(),
            message: n.message.clone(),
            when: n
                .created_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    coordinator: &Coordinator,
    args: NotificationsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        NotificationsCommand::List(NotificationsListArgs { unread }) => {
            let snapshot = coordinator.notifications().entries();
            let items: Vec<Notification> = snapshot
                .iter()
                .filter(|n| !unread || !n.read)
                .cloned()
                .collect();

            let rendered = output::render_list(
                &global.output,
                &items,
                |n| NotificationRow::from(n),
                |n| n.id.to_string(),
            );
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        NotificationsCommand::Count => {
            let count = coordinator.notifications().unread_count();
            output::print_output(&count.to_string(), global.quiet);
            Ok(())
        }

        NotificationsCommand::MarkRead(NotificationIdArg { id }) => {
            coordinator.mark_notification_read(id).await;
            output::print_output("Marked read", global.quiet);
            Ok(())
        }

        NotificationsCommand::MarkAllRead => {
            coordinator.mark_all_notifications_read().await;
            output::print_output("All notifications marked read", global.quiet);
            Ok(())
        }
    }
}
