//! Restore command handler.

use dnsvault_core::{Engine, RestoreMode, RestoreReport};

use crate::cli::{GlobalOpts, RestoreArgs};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util::{self, OutcomeRow};

fn detail(r: &RestoreReport, painter: Painter) -> String {
    let mut pairs = vec![
        ("Snapshot", r.snapshot.display().to_string()),
        ("Checksum", format!("{} (verified)", r.checksum)),
        ("Destination", r.destination.to_string()),
        ("Mode", r.mode.to_string()),
    ];
    if let Some(ref pre) = r.pre_restore {
        pairs.push(("Pre-restore", pre.display().to_string()));
    }

    let rows: Vec<OutcomeRow> = r.outcomes.iter().map(OutcomeRow::from).collect();
    let mut out = format!("{}\n\n{}", output::detail_lines(&pairs), output::render_table(&rows));

    if r.mode == RestoreMode::DryRun {
        out.push_str(&format!(
            "\n\n{}",
            painter.warn(&format!(
                "Dry run: {} records would be written to {}. Re-run with --no-dry-run to apply.",
                r.outcomes.len(),
                r.destination
            ))
        ));
    } else {
        out.push_str(&format!(
            "\n\n{} applied, {} failed",
            r.applied(),
            r.failures()
        ));
    }
    out
}

fn plain(r: &RestoreReport) -> String {
    r.outcomes
        .iter()
        .map(util::outcome_line)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(engine: &Engine, args: RestoreArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let destination = args.provider.map(util::source_kind);
    let mode = if args.no_dry_run {
        RestoreMode::Live
    } else {
        RestoreMode::DryRun
    };

    if mode == RestoreMode::Live {
        let target = destination.map_or_else(|| "its provider".to_owned(), |d| d.to_string());
        let prompt = format!("Write every record in {} to {target}?", args.file);
        if !util::confirm(&prompt, "restore", global.yes)? {
            return Err(CliError::Aborted);
        }
    }

    let spinner = util::spinner(global, "Restoring");
    let result = engine.restore(&args.file, destination, mode).await;
    spinner.finish_and_clear();
    let report = result?;

    let painter = Painter::new(&global.color);
    let out = output::render_single(&global.output, &report, |r| detail(r, painter), plain)?;
    output::print_output(&out, global.quiet);

    let failed = report.failures();
    if failed > 0 {
        if let Some(pre) = report.pre_restore.as_ref().filter(|_| !global.quiet) {
            eprintln!(
                "The state before this restore was saved to {}",
                pre.display()
            );
        }
        return Err(CliError::PartialFailure {
            failed,
            total: report.outcomes.len(),
        });
    }
    Ok(())
}
