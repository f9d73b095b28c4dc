//! CLI-side configuration resolution.
//!
//! Bridges the shared `devdock-config` layer with `GlobalOpts` flag
//! overrides: profile selection, server/TLS/timeout overrides, and the
//! credential chain (flags → env → keyring → config file).

use secrecy::SecretString;

use devdock_config as cfg;
use devdock_core::{ServiceConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The profile name to operate on: flag/env, then config default.
pub fn active_profile_name(global: &GlobalOpts, config: &cfg::Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `ServiceConfig` from the config file, profile, and CLI overrides.
pub fn resolve_service_config(global: &GlobalOpts) -> Result<ServiceConfig, CliError> {
    let config = cfg::load_config_or_default();
    let profile_name = active_profile_name(global, &config);

    let mut service = if let Some(profile) = config.profiles.get(&profile_name) {
        cfg::profile_to_service_config(profile)?
    } else if let Some(ref server) = global.server {
        // No profile -- build from flags/env alone.
        ServiceConfig {
            url: parse_server(server)?,
            ..ServiceConfig::default()
        }
    } else {
        return Err(CliError::NoConfig {
            path: cfg::config_path().display().to_string(),
        });
    };

    // Flag overrides beat the profile.
    if let Some(ref server) = global.server {
        service.url = parse_server(server)?;
    }
    if global.insecure {
        service.tls = TlsVerification::DangerAcceptInvalid;
    }
    service.timeout = std::time::Duration::from_secs(global.timeout);

    Ok(service)
}

fn parse_server(server: &str) -> Result<url::Url, CliError> {
    server.parse().map_err(|_| CliError::Validation {
        field: "server".into(),
        reason: format!("invalid URL: {server}"),
    })
}

/// Resolve sign-in credentials with flag overrides.
///
/// Username: `--username` / env beats the profile's. Password chain:
/// the profile's `password_env`, `DEVDOCK_PASSWORD`, the system keyring,
/// then plaintext in the config file.
pub fn resolve_credentials(global: &GlobalOpts) -> Result<(String, SecretString), CliError> {
    let config = cfg::load_config_or_default();
    let profile_name = active_profile_name(global, &config);
    let profile = config.profiles.get(&profile_name);

    let username = global
        .username
        .clone()
        .or_else(|| profile.and_then(|p| p.username.clone()))
        .ok_or_else(|| CliError::NoCredentials {
            profile: profile_name.clone(),
        })?;

    if let Some(p) = profile {
        if let Some(ref env_name) = p.password_env {
            if let Ok(pw) = std::env::var(env_name) {
                return Ok((username, SecretString::from(pw)));
            }
        }
    }

    if let Ok(pw) = std::env::var("DEVDOCK_PASSWORD") {
        return Ok((username, SecretString::from(pw)));
    }

    if let Ok(entry) = keyring::Entry::new("devdock", &format!("{profile_name}/password")) {
        if let Ok(pw) = entry.get_password() {
            return Ok((username, SecretString::from(pw)));
        }
    }

    if let Some(pw) = profile.and_then(|p| p.password.clone()) {
        return Ok((username, SecretString::from(pw)));
    }

    Err(CliError::NoCredentials {
        profile: profile_name,
    })
}
