//! Backup command handler.

use serde::Serialize;

use dnsvault_core::{BackupOutcome, Engine, SkippedSource};

use crate::cli::{BackupArgs, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util;

// ── Summary ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct BackupSummary<'a> {
    path: String,
    domain: &'a str,
    label: &'a str,
    timestamp: &'a str,
    total_records: usize,
    checksum: &'a str,
    skipped: &'a [SkippedSource],
}

impl<'a> From<&'a BackupOutcome> for BackupSummary<'a> {
    fn from(o: &'a BackupOutcome) -> Self {
        Self {
            path: o.path.display().to_string(),
            domain: &o.snapshot.domain,
            label: &o.snapshot.label,
            timestamp: &o.snapshot.timestamp,
            total_records: o.snapshot.total_records,
            checksum: &o.snapshot.checksum,
            skipped: &o.skipped,
        }
    }
}

fn detail(s: &BackupSummary<'_>) -> String {
    output::detail_lines(&[
        ("File", s.path.clone()),
        ("Domain", s.domain.to_owned()),
        ("Label", s.label.to_owned()),
        ("Taken", s.timestamp.to_owned()),
        ("Records", s.total_records.to_string()),
        ("Checksum", s.checksum.to_owned()),
    ])
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(engine: &Engine, args: BackupArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let target = util::backup_target(args.source);
    let spinner = util::spinner(global, &format!("Backing up {}", engine.config().domain));
    let result = engine.backup(target).await;
    spinner.finish_and_clear();
    let outcome = result?;

    if !global.quiet {
        let painter = Painter::new(&global.color);
        for skip in &outcome.skipped {
            eprintln!(
                "{}",
                painter.warn(&format!("Skipped {}: {}", skip.source, skip.reason))
            );
        }
    }

    let summary = BackupSummary::from(&outcome);
    let out = output::render_single(&global.output, &summary, detail, |s| s.path.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
