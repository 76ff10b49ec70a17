//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tabled::Tabled;

use dnsvault_core::{ApplyStatus, BackupTarget, Preset, Record, RecordOutcome, SourceKind};

use crate::cli::{BackupSource, GlobalOpts, PresetArg, ProviderArg};
use crate::error::CliError;

// ── Arg → core mapping ──────────────────────────────────────────────

pub fn backup_target(source: BackupSource) -> BackupTarget {
    match source {
        BackupSource::All | BackupSource::Unified => BackupTarget::Unified,
        BackupSource::Cloudflare => BackupTarget::Source(SourceKind::Cloudflare),
        BackupSource::Canspace => BackupTarget::Source(SourceKind::Canspace),
        BackupSource::Public => BackupTarget::Source(SourceKind::Public),
    }
}

pub fn source_kind(provider: ProviderArg) -> SourceKind {
    match provider {
        ProviderArg::Cloudflare => SourceKind::Cloudflare,
        ProviderArg::Canspace => SourceKind::Canspace,
    }
}

pub fn preset(preset: PresetArg) -> Preset {
    match preset {
        PresetArg::Sample => Preset::Sample,
        PresetArg::Vercel => Preset::Vercel,
        PresetArg::GithubPages => Preset::GithubPages,
        PresetArg::GoogleWorkspace => Preset::GoogleWorkspace,
        PresetArg::Office365 => Preset::Office365,
    }
}

/// Read and parse a JSON file given on the command line.
pub fn read_json_file(path: &Path) -> Result<serde_json::Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: path.display().to_string(),
        reason: format!("invalid JSON: {e}"),
    })
}

// ── Interaction ─────────────────────────────────────────────────────

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// A stderr spinner for network-bound work; hidden when quiet or not a TTY.
pub fn spinner(global: &GlobalOpts, message: &str) -> ProgressBar {
    if global.quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_owned());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

// ── Shared table rows ───────────────────────────────────────────────

#[derive(Tabled)]
pub struct RecordRow {
    #[tabled(rename = "Type")]
    record_type: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "TTL")]
    ttl: u32,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Source")]
    source: String,
}

impl From<&Record> for RecordRow {
    fn from(r: &Record) -> Self {
        Self {
            record_type: r.record_type.clone(),
            name: r.name.clone(),
            value: truncate(&r.value, 60),
            ttl: r.ttl,
            priority: r.priority.map(|p| p.to_string()).unwrap_or_default(),
            source: r.source.clone(),
        }
    }
}

#[derive(Tabled)]
pub struct OutcomeRow {
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Type")]
    record_type: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Error")]
    error: String,
}

/// Short lowercase word for an apply status.
pub fn status_label(status: &ApplyStatus) -> &'static str {
    match status {
        ApplyStatus::Planned => "planned",
        ApplyStatus::Created => "created",
        ApplyStatus::Updated => "updated",
        ApplyStatus::Deleted => "deleted",
        ApplyStatus::Absent => "absent",
        ApplyStatus::Failed(_) => "failed",
    }
}

impl From<&RecordOutcome> for OutcomeRow {
    fn from(o: &RecordOutcome) -> Self {
        let error = match &o.status {
            ApplyStatus::Failed(e) => e.clone(),
            _ => String::new(),
        };
        Self {
            status: status_label(&o.status).into(),
            record_type: o.record.record_type.clone(),
            name: o.record.name.clone(),
            value: truncate(&o.record.value, 48),
            error,
        }
    }
}

/// One line per outcome for `--output plain`.
pub fn outcome_line(o: &RecordOutcome) -> String {
    format!("{}\t{}", status_label(&o.status), o.record.key())
}

/// Shorten long values (DKIM keys, SPF strings) for table cells.
pub fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_owned();
    }
    let kept: String = value.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_values() {
        assert_eq!(truncate("192.0.2.1", 10), "192.0.2.1");
        assert_eq!(truncate("v=DKIM1; k=rsa; p=MIIB", 10), "v=DKIM1; …");
    }

    #[test]
    fn dig_and_all_map_to_core_targets() {
        assert_eq!(backup_target(BackupSource::All), BackupTarget::Unified);
        assert_eq!(
            backup_target(BackupSource::Public),
            BackupTarget::Source(SourceKind::Public)
        );
    }
}
