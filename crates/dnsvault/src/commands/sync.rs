//! Sync command handler.

use tabled::Tabled;

use dnsvault_core::{ApplyStatus, Engine, RecordOutcome, SourceKind, SyncReport};

use crate::cli::{GlobalOpts, SyncArgs};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SyncRow {
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Type")]
    record_type: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl SyncRow {
    fn new(target: SourceKind, o: &RecordOutcome) -> Self {
        let status = match &o.status {
            ApplyStatus::Failed(e) => format!("failed: {e}"),
            other => util::status_label(other).to_owned(),
        };
        Self {
            target: target.to_string(),
            status,
            record_type: o.record.record_type.clone(),
            name: o.record.name.clone(),
            value: util::truncate(&o.record.value, 48),
        }
    }
}

fn detail(r: &SyncReport, painter: Painter) -> String {
    let rows: Vec<SyncRow> = r
        .targets
        .iter()
        .flat_map(|t| t.outcomes.iter().map(|o| SyncRow::new(t.provider, o)))
        .collect();

    let mut lines = vec![format!(
        "Read {} records from {}, skipped {} NS/SOA",
        r.fetched, r.from, r.skipped
    )];
    if !rows.is_empty() {
        lines.push(output::render_table(&rows));
    }
    if r.dry_run {
        lines.push(painter.warn("Dry run: nothing was written."));
    } else {
        lines.push(format!("{} failed", r.failures()));
    }
    lines.join("\n\n")
}

fn plain(r: &SyncReport) -> String {
    r.targets
        .iter()
        .flat_map(|t| {
            t.outcomes
                .iter()
                .map(move |o| format!("{}\t{}", t.provider, util::outcome_line(o)))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(engine: &Engine, args: SyncArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let from = util::source_kind(args.from);
    let to = args.to.map(util::source_kind);

    if !args.dry_run {
        let target = to.map_or_else(|| "every other provider".to_owned(), |t| t.to_string());
        let prompt = format!("Copy {from} records to {target}?");
        if !util::confirm(&prompt, "sync", global.yes)? {
            return Err(CliError::Aborted);
        }
    }

    let spinner = util::spinner(global, &format!("Syncing from {from}"));
    let result = engine.sync(Some(from), to, args.dry_run).await;
    spinner.finish_and_clear();
    let report = result?;

    let painter = Painter::new(&global.color);
    let out = output::render_single(&global.output, &report, |r| detail(r, painter), plain)?;
    output::print_output(&out, global.quiet);

    let failed = report.failures();
    if failed > 0 {
        return Err(CliError::PartialFailure {
            failed,
            total: report.targets.iter().map(|t| t.outcomes.len()).sum(),
        });
    }
    Ok(())
}
