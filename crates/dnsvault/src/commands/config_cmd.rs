//! Config subcommand handlers.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};
use dnsvault_config::Secret;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, SecretKind};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

const MASK: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of the config with plaintext secrets masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.cloudflare_api_token.is_some() {
            profile.cloudflare_api_token = Some(MASK.into());
        }
        if profile.canspace_password.is_some() {
            profile.canspace_password = Some(MASK.into());
        }
    }
    cfg
}

/// Format config for display as TOML, secrets already masked.
fn format_config(cfg: &Config) -> String {
    toml::to_string_pretty(cfg).unwrap_or_else(|e| format!("# failed to format config: {e}"))
}

fn secret(kind: SecretKind) -> Secret {
    match kind {
        SecretKind::CloudflareToken => Secret::CloudflareToken,
        SecretKind::CanspacePassword => Secret::CanspacePassword,
    }
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn prompt_secret(label: &str) -> Result<String, CliError> {
    let value = rpassword::prompt_password(label).map_err(prompt_err)?;
    if value.is_empty() {
        return Err(CliError::Validation {
            field: "secret".into(),
            reason: "value cannot be empty".into(),
        });
    }
    Ok(value)
}

/// Offer to store a secret in the system keyring or return it for plaintext config.
///
/// Returns `Some(secret)` if the user chose plaintext, `None` if stored in keyring.
fn prompt_keyring_storage(
    value: &str,
    profile_name: &str,
    secret: Secret,
    label: &str,
) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt(format!("Where to store the {label}?"))
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        dnsvault_config::store_secret(profile_name, secret, value)?;
        eprintln!("   ✓ {label} stored in system keyring");
        Ok(None)
    } else {
        // A keyring entry would shadow the plaintext value.
        dnsvault_config::delete_secret(profile_name, secret)?;
        Ok(Some(value.to_owned()))
    }
}

// ── Init wizard ─────────────────────────────────────────────────────

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let config_path = config::config_path(global);
    eprintln!("dnsvault configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    // Keep other profiles when re-running the wizard.
    let mut cfg = config::load_config(global)?;

    // 1. Profile name
    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    // 2. Domain
    let domain: String = Input::new()
        .with_prompt("Domain")
        .interact_text()
        .map_err(prompt_err)?;

    // 3. Backup directory
    let backup_dir: String = Input::new()
        .with_prompt("Backup directory")
        .default(dnsvault_config::default_backup_dir().display().to_string())
        .interact_text()
        .map_err(prompt_err)?;

    let mut profile = Profile {
        domain: domain.trim().to_owned(),
        backup_dir: Some(PathBuf::from(backup_dir)),
        ..Profile::default()
    };

    // 4. Cloudflare
    let cloudflare = Confirm::new()
        .with_prompt("Configure Cloudflare?")
        .default(true)
        .interact()
        .map_err(prompt_err)?;
    if cloudflare {
        let token = prompt_secret("Cloudflare API token: ")?;
        profile.cloudflare_api_token =
            prompt_keyring_storage(&token, &profile_name, Secret::CloudflareToken, "API token")?;
    }

    // 5. Canspace (cPanel)
    let canspace = Confirm::new()
        .with_prompt("Configure Canspace (cPanel)?")
        .default(false)
        .interact()
        .map_err(prompt_err)?;
    if canspace {
        let username: String = Input::new()
            .with_prompt("cPanel username")
            .interact_text()
            .map_err(prompt_err)?;
        let password = prompt_secret("cPanel password: ")?;
        profile.canspace_username = Some(username);
        profile.canspace_password =
            prompt_keyring_storage(&password, &profile_name, Secret::CanspacePassword, "password")?;
    }

    // 6. Write config
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    config::save_config(global, &cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: dnsvault backup");
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config(global)?);
            let out =
                output::render_single(&global.output, &cfg, format_config, |_| "config".into())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path(global).display());
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config(global)?;
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: dnsvault config init");
            } else {
                for (name, profile) in &cfg.profiles {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}\t{}", profile.domain);
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config(global)?;
            cfg.profile(&name)?;
            cfg.default_profile = Some(name.clone());
            config::save_config(global, &cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── SetSecret ───────────────────────────────────────────────
        ConfigCommand::SetSecret { secret: kind } => {
            let cfg = config::load_config(global)?;
            let profile_name = config::active_profile_name(global, &cfg);
            cfg.profile(&profile_name)?;

            let secret = secret(kind);
            let value = prompt_secret(&format!("{secret}: "))?;
            dnsvault_config::store_secret(&profile_name, secret, &value)?;
            eprintln!("✓ {secret} stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn show_masks_plaintext_secrets() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                domain: "example.com".into(),
                cloudflare_api_token: Some("cf-secret".into()),
                canspace_password: Some("cp-secret".into()),
                ..Profile::default()
            },
        );

        let shown = format_config(&redacted(&cfg));
        assert!(!shown.contains("cf-secret"));
        assert!(!shown.contains("cp-secret"));
        assert!(shown.contains(MASK));
        assert!(shown.contains("example.com"));
    }
}
