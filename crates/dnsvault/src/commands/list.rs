//! List command handler.

use tabled::Tabled;

use dnsvault_core::{Engine, SnapshotInfo};

use crate::cli::{GlobalOpts, ListArgs};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SnapshotRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Taken")]
    taken: String,
    #[tabled(rename = "Records")]
    records: usize,
    #[tabled(rename = "Size")]
    size: String,
}

impl From<&SnapshotInfo> for SnapshotRow {
    fn from(s: &SnapshotInfo) -> Self {
        Self {
            file: s.file_name.clone(),
            label: s.label.clone(),
            taken: s.taken_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            records: s.records,
            size: output::human_size(s.size),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(engine: &Engine, args: &ListArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshots = engine.list(args.days)?;

    if snapshots.is_empty() {
        if !global.quiet {
            eprintln!(
                "No snapshots in {} from the last {} days",
                engine.store().dir().display(),
                args.days
            );
        }
        return Ok(());
    }

    let out = output::render_list(
        &global.output,
        &snapshots,
        |s| SnapshotRow::from(s),
        |s| s.path.display().to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
