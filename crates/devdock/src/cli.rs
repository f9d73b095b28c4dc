//! Clap derive structures for the `devdock` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// devdock -- command-line client for the DeviceDock service
#[derive(Debug, Parser)]
#[command(
    name = "devdock",
    version,
    about = "Manage devices and notifications from the command line",
    long_about = "A command-line client for a DeviceDock device-management service.\n\n\
        Talks to the service's REST API for device CRUD and notifications,\n\
        and to its live hub for real-time updates (see `devdock watch`).",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Service profile to use
    #[arg(long, short = 'p', env = "DEVDOCK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Service root URL (overrides profile)
    #[arg(long, short = 's', env = "DEVDOCK_SERVER", global = true)]
    pub server: Option<String>,

    /// Username (overrides profile)
    #[arg(long, short = 'u', env = "DEVDOCK_USERNAME", global = true)]
    pub username: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "DEVDOCK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "DEVDOCK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "DEVDOCK_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in, verify credentials, and remember them for later commands
    Login(LoginArgs),

    /// Create a new account (self-registration gets the User role)
    Register(RegisterArgs),

    /// End the server session and forget the remembered user
    Logout,

    /// Show the remembered user
    Whoami,

    /// Manage device records
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// View and manage the notification feed
    #[command(alias = "notif", alias = "n")]
    Notifications(NotificationsArgs),

    /// Queue an average computation over a device column
    Average(AverageArgs),

    /// Stay connected and stream live events until interrupted
    Watch,

    /// Manage configuration profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Username to sign in as (prompted if omitted)
    pub username: Option<String>,

    /// Don't store the password in the system keyring
    #[arg(long)]
    pub no_store: bool,
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    /// Username for the new account (prompted if omitted)
    pub username: Option<String>,
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices
    #[command(alias = "ls")]
    List(DevicesListArgs),

    /// Create a device
    Add(DeviceAddArgs),

    /// Update a device's name and description
    Update(DeviceUpdateArgs),

    /// Soft-delete a device (restorable)
    #[command(alias = "rm")]
    Delete(DeviceIdArg),

    /// Restore a soft-deleted device
    Restore(DeviceIdArg),
}

#[derive(Debug, Args)]
pub struct DevicesListArgs {
    /// Show the deleted partition instead of the active one
    #[arg(long)]
    pub deleted: bool,

    /// Case-insensitive substring filter
    #[arg(long, short = 'f')]
    pub filter: Option<String>,

    /// Restrict the filter to one field (admin-style search)
    #[arg(long, value_enum)]
    pub field: Option<SearchFieldArg>,

    /// Page number (1-based)
    #[arg(long, default_value = "1")]
    pub page: usize,

    /// Page size
    #[arg(long, default_value = "5")]
    pub page_size: usize,

    /// Disable pagination and print everything
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SearchFieldArg {
    Name,
    Description,
    CreatedBy,
}

#[derive(Debug, Args)]
pub struct DeviceAddArgs {
    /// Device name (unique among active devices)
    pub name: String,

    /// Description
    #[arg(long, short = 'd', default_value = "")]
    pub description: String,

    /// If the name collides with a soft-deleted device, restore it
    /// instead of failing
    #[arg(long)]
    pub restore_if_deleted: bool,
}

#[derive(Debug, Args)]
pub struct DeviceUpdateArgs {
    /// Device id
    pub id: i64,

    /// New device name
    #[arg(long, short = 'n')]
    pub name: String,

    /// New description
    #[arg(long, short = 'd', default_value = "")]
    pub description: String,
}

#[derive(Debug, Args)]
pub struct DeviceIdArg {
    /// Device id
    pub id: i64,
}

// ── Notifications ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NotificationsArgs {
    #[command(subcommand)]
    pub command: NotificationsCommand,
}

#[derive(Debug, Subcommand)]
pub enum NotificationsCommand {
    /// List the notification feed, newest first
    #[command(alias = "ls")]
    List(NotificationsListArgs),

    /// Show the unread count
    Count,

    /// Mark one notification read
    MarkRead(NotificationIdArg),

    /// Mark the whole feed read
    MarkAllRead,
}

#[derive(Debug, Args)]
pub struct NotificationsListArgs {
    /// Show unread entries only
    #[arg(long)]
    pub unread: bool,
}

#[derive(Debug, Args)]
pub struct NotificationIdArg {
    /// Notification id
    pub id: i64,
}

// ── Average ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AverageArgs {
    /// Column to average (e.g. "Temperature")
    pub column: String,

    /// Wait for the computed value to arrive over the live hub
    #[arg(long)]
    pub wait: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Show the resolved configuration
    Show,

    /// Create or update a profile interactively
    Init,

    /// Store a password in the system keyring for a profile
    SetPassword,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
