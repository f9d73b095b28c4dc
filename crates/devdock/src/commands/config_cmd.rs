//! Config command handlers.

use dialoguer::{Confirm, Input};
use tracing::warn;

use devdock_config as cfg;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::active_profile_name;
use crate::error::CliError;
use crate::output::print_output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            print_output(&cfg::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => show(global),

        ConfigCommand::Init => init(global),

        ConfigCommand::SetPassword => set_password(global),
    }
}

/// Print the resolved configuration with secrets masked.
fn show(global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = cfg::load_config_or_default();
    for profile in config.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some("<redacted>".into());
        }
    }

    let rendered = toml::to_string_pretty(&config).map_err(cfg::ConfigError::Serialization)?;
    print_output(&rendered, global.quiet);
    Ok(())
}

/// Create or update a profile interactively.
fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = cfg::load_config_or_default();
    let default_name = active_profile_name(global, &config);

    let name: String = Input::new()
        .with_prompt("Profile name")
        .default(default_name)
        .interact_text()
        .map_err(to_io)?;

    let existing = config.profiles.get(&name);

    let server: String = {
        let mut input = Input::new().with_prompt("Service URL (e.g. https://devices.example.com)");
        if let Some(p) = existing {
            input = input.default(p.server.clone());
        }
        input.interact_text().map_err(to_io)?
    };

    let username: String = {
        let mut input = Input::new().with_prompt("Username");
        if let Some(u) = existing.and_then(|p| p.username.clone()) {
            input = input.default(u);
        }
        input.interact_text().map_err(to_io)?
    };

    let insecure = Confirm::new()
        .with_prompt("Accept self-signed TLS certificates?")
        .default(false)
        .interact()
        .map_err(to_io)?;

    config.profiles.insert(
        name.clone(),
        cfg::Profile {
            server,
            username: Some(username),
            password: None,
            password_env: None,
            ca_cert: None,
            insecure: Some(insecure),
            timeout: None,
            hub: None,
        },
    );
    if config.default_profile.is_none() {
        config.default_profile = Some(name.clone());
    }
    cfg::save_config(&config)?;

    // Password goes to the keyring, never to the TOML file.
    if Confirm::new()
        .with_prompt("Store a password in the system keyring now?")
        .default(true)
        .interact()
        .map_err(to_io)?
    {
        let password = rpassword::prompt_password("Password: ")?;
        if let Err(e) = cfg::store_password(&name, &password) {
            warn!(error = %e, "could not store password in keyring");
        }
    }

    print_output(
        &format!("Profile '{name}' saved to {}", cfg::config_path().display()),
        global.quiet,
    );
    Ok(())
}

/// Store a password in the system keyring for a profile.
fn set_password(global: &GlobalOpts) -> Result<(), CliError> {
    let config = cfg::load_config_or_default();
    let name = active_profile_name(global, &config);

    if !config.profiles.contains_key(&name) {
        let available: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
        return Err(CliError::ProfileNotFound {
            name,
            available: available.join(", "),
        });
    }

    let password = rpassword::prompt_password("Password: ")?;
    cfg::store_password(&name, &password)?;
    print_output(&format!("Password stored for profile '{name}'"), global.quiet);
    Ok(())
}

fn to_io(e: dialoguer::Error) -> CliError {
    CliError::Io(std::io::Error::other(e))
}
