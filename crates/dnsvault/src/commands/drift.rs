//! Drift command handler.

use tabled::Tabled;

use dnsvault_core::{DriftEntry, DriftReport, DriftStatus, Engine};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DriftRow {
    #[tabled(rename = "Record")]
    key: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Values")]
    values: String,
}

fn status_label(status: &DriftStatus) -> String {
    match status {
        DriftStatus::InSync => "in sync".into(),
        DriftStatus::Different => "different".into(),
        DriftStatus::Missing(providers) => {
            let names: Vec<String> = providers.iter().map(ToString::to_string).collect();
            format!("missing from {}", names.join(", "))
        }
    }
}

impl From<&DriftEntry> for DriftRow {
    fn from(e: &DriftEntry) -> Self {
        let values = e
            .values
            .iter()
            .map(|(provider, values)| {
                let joined: Vec<String> = values.iter().map(|v| util::truncate(v, 40)).collect();
                format!("{provider}: {}", joined.join(", "))
            })
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            key: e.key.clone(),
            status: status_label(&e.status),
            values,
        }
    }
}

fn detail(r: &DriftReport, painter: Painter) -> String {
    let rows: Vec<DriftRow> = r
        .entries
        .iter()
        .filter(|e| e.status != DriftStatus::InSync)
        .map(DriftRow::from)
        .collect();

    let providers: Vec<String> = r.providers.iter().map(ToString::to_string).collect();
    let summary = format!(
        "{} of {} records differ across {}",
        r.differences(),
        r.entries.len(),
        providers.join(", ")
    );
    if rows.is_empty() {
        return painter.added(&format!("All {} records in sync across {}", r.entries.len(), providers.join(", ")));
    }
    format!("{}\n\n{}", output::render_table(&rows), painter.warn(&summary))
}

fn plain(r: &DriftReport) -> String {
    r.entries
        .iter()
        .filter(|e| e.status != DriftStatus::InSync)
        .map(|e| format!("{}\t{}", e.key, status_label(&e.status)))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

/// Differences are reported, not treated as failures.
pub async fn handle(engine: &Engine, global: &GlobalOpts) -> Result<(), CliError> {
    let spinner = util::spinner(global, "Comparing providers");
    let result = engine.drift().await;
    spinner.finish_and_clear();
    let report = result?;

    let painter = Painter::new(&global.color);
    let out = output::render_single(&global.output, &report, |r| detail(r, painter), plain)?;
    output::print_output(&out, global.quiet);
    Ok(())
}
