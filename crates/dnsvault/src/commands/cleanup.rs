//! Cleanup command handler.

use dnsvault_core::{CleanupReport, Engine};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

fn paths(r: &CleanupReport) -> String {
    r.removed
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(engine: &Engine, global: &GlobalOpts) -> Result<(), CliError> {
    let report = engine.cleanup()?;

    if !global.quiet {
        eprintln!(
            "Removed {} duplicate snapshots, kept {}",
            report.removed.len(),
            report.kept
        );
    }

    let out = output::render_single(&global.output, &report, paths, paths)?;
    output::print_output(&out, global.quiet);
    Ok(())
}
