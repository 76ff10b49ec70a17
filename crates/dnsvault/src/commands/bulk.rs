//! Bulk command handler.

use tabled::Tabled;

use dnsvault_core::{ApplyStatus, BulkOutcome, BulkReport, BulkUpdate, Engine, SourceKind};

use crate::cli::{BulkArgs, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct BulkRow {
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Type")]
    record_type: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl BulkRow {
    fn new(target: SourceKind, o: &BulkOutcome) -> Self {
        let status = match &o.outcome.status {
            ApplyStatus::Failed(e) => format!("failed: {e}"),
            other => util::status_label(other).to_owned(),
        };
        let record = &o.outcome.record;
        Self {
            target: target.to_string(),
            action: o.action.to_string(),
            status,
            record_type: record.record_type.clone(),
            name: record.name.clone(),
            value: util::truncate(&record.value, 48),
        }
    }
}

fn detail(r: &BulkReport, painter: Painter) -> String {
    let rows: Vec<BulkRow> = r
        .targets
        .iter()
        .flat_map(|t| t.outcomes.iter().map(|o| BulkRow::new(t.provider, o)))
        .collect();

    let mut lines = vec![output::render_table(&rows)];
    if r.dry_run {
        lines.push(painter.warn("Dry run: nothing was written."));
    } else {
        lines.push(format!("{} applied, {} failed", r.applied(), r.failures()));
    }
    lines.join("\n\n")
}

fn plain(r: &BulkReport) -> String {
    r.targets
        .iter()
        .flat_map(|t| {
            t.outcomes.iter().map(move |o| {
                format!(
                    "{}\t{}\t{}",
                    t.provider,
                    o.action,
                    util::outcome_line(&o.outcome)
                )
            })
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(engine: &Engine, args: BulkArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let updates: Vec<BulkUpdate> = serde_json::from_value(util::read_json_file(&args.file)?)
        .map_err(|e| CliError::Validation {
            field: args.file.display().to_string(),
            reason: format!("not an updates file: {e}"),
        })?;
    let to = args.provider.map(util::source_kind);

    if !args.dry_run {
        let target = to.map_or_else(|| "every configured provider".to_owned(), |t| t.to_string());
        let prompt = format!("Apply {} updates to {target}?", updates.len());
        if !util::confirm(&prompt, "bulk", global.yes)? {
            return Err(CliError::Aborted);
        }
    }

    let spinner = util::spinner(global, "Applying updates");
    let result = engine.bulk(&updates, to, args.dry_run).await;
    spinner.finish_and_clear();
    let report = result?;

    let painter = Painter::new(&global.color);
    let out = output::render_single(&global.output, &report, |r| detail(r, painter), plain)?;
    output::print_output(&out, global.quiet);

    let failed = report.failures();
    if failed > 0 {
        return Err(CliError::PartialFailure {
            failed,
            total: report.attempted(),
        });
    }
    Ok(())
}
