//! Device command handlers.

use tabled::Tabled;

use devdock_core::search::{self, SearchField};
use devdock_core::{AddDeviceOutcome, Coordinator, Device};

use crate::cli::{
    DeviceAddArgs, DeviceIdArg, DeviceUpdateArgs, DevicesArgs, DevicesCommand, DevicesListArgs,
    GlobalOpts, OutputFormat, SearchFieldArg,
};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Created By")]
    created_by: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        Self {
            id: d.id,
            name: d.name.clone(),
            description: d.description.clone(),
            created_by: d.created_by.clone().unwrap_or_default(),
            status: if d.deleted { "deleted" } else { "active" }.into(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    coordinator: &Coordinator,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List(list) => handle_list(coordinator, &list, global),

        DevicesCommand::Add(add) => handle_add(coordinator, add, global).await,

        DevicesCommand::Update(DeviceUpdateArgs {
            id,
            name,
            description,
        }) => {
            coordinator.update_device(id, &name, &description).await?;
            output::print_output("Device updated", global.quiet);
            Ok(())
        }

        DevicesCommand::Delete(DeviceIdArg { id }) => {
            let name = coordinator
                .devices()
                .active()
                .iter()
                .find(|d| d.id == id)
                .map(|d| d.name.clone())
                .ok_or(CliError::DeviceNotFound { id })?;

            if !util::confirm(
                &format!("Delete device \"{name}\"?"),
                global,
                "devices delete",
            )? {
                return Ok(());
            }

            coordinator.remove_device(id).await?;
            output::print_output(
                &format!("Device deleted (restore with `devdock devices restore {id}`)"),
                global.quiet,
            );
            Ok(())
        }

        DevicesCommand::Restore(DeviceIdArg { id }) => {
            coordinator.restore_device(id).await?;
            output::print_output("Device restored", global.quiet);
            Ok(())
        }
    }
}

fn handle_list(
    coordinator: &Coordinator,
    list: &DevicesListArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let snapshot = if list.deleted {
        coordinator.devices().deleted()
    } else {
        coordinator.devices().active()
    };

    let field = list.field.map(|f| match f {
        SearchFieldArg::Name => SearchField::Name,
        SearchFieldArg::Description => SearchField::Description,
        SearchFieldArg::CreatedBy => SearchField::CreatedBy,
    });
    let filtered: Vec<Device> = search::filter_devices(
        &snapshot,
        list.filter.as_deref().unwrap_or_default(),
        field,
    )
    .into_iter()
    .cloned()
    .collect();

    let (items, footer) = if list.all {
        (filtered, None)
    } else {
        let page = search::paginate(&filtered, list.page, list.page_size);
        let footer = (page.total_pages > 1).then(|| {
            format!(
                "Page {} of {} ({} devices)",
                page.page, page.total_pages, page.total_items
            )
        });
        (page.items, footer)
    };

    let rendered = output::render_list(
        &global.output,
        &items,
        |d| DeviceRow::from(d),
        |d| d.id.to_string(),
    );
    output::print_output(&rendered, global.quiet);

    if matches!(global.output, OutputFormat::Table) {
        if let Some(footer) = footer {
            output::print_output(&footer, global.quiet);
        }
    }
    Ok(())
}

async fn handle_add(
    coordinator: &Coordinator,
    add: DeviceAddArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match coordinator.add_device(&add.name, &add.description).await? {
        AddDeviceOutcome::Added => {
            output::print_output("Device added", global.quiet);
            Ok(())
        }
        AddDeviceOutcome::ConflictWithDeleted {
            restore_id,
            message,
        } => {
            let Some(id) = restore_id else {
                return Err(CliError::ApiError { message });
            };

            let restore = add.restore_if_deleted
                || util::confirm(
                    &format!("Device \"{}\" exists but is deleted. Restore it?", add.name),
                    global,
                    "devices add --restore-if-deleted",
                )
                .unwrap_or(false);

            if !restore {
                return Err(CliError::DeletedConflict {
                    name: add.name,
                    id: id.to_string(),
                });
            }

            coordinator.restore_device(id).await?;
            output::print_output("Device restored", global.quiet);
            Ok(())
        }
    }
}
