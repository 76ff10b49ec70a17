//! Verify command handler.

use dnsvault_core::{Engine, VerifyReport};

use crate::cli::{FileArgs, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, Painter};

fn detail(r: &VerifyReport, painter: Painter) -> String {
    let status = if r.intact {
        painter.added("intact")
    } else {
        painter.removed("MISMATCH")
    };
    output::detail_lines(&[
        ("File", r.path.display().to_string()),
        ("Status", status),
        ("Domain", r.domain.clone()),
        ("Label", r.label.clone()),
        ("Taken", r.timestamp.clone()),
        ("Records", r.total_records.to_string()),
        ("Stored", r.stored.clone()),
        ("Computed", r.computed.clone()),
    ])
}

// ── Handler ─────────────────────────────────────────────────────────

/// Prints the report in every case; a mismatch then fails the command.
pub fn handle(engine: &Engine, args: &FileArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let report = engine.verify(&args.file)?;
    let painter = Painter::new(&global.color);

    let out = output::render_single(
        &global.output,
        &report,
        |r| detail(r, painter),
        |r| if r.intact { "ok".into() } else { "mismatch".into() },
    )?;
    output::print_output(&out, global.quiet);

    if report.intact {
        Ok(())
    } else {
        Err(CliError::Integrity {
            path: report.path.display().to_string(),
            stored: report.stored,
            computed: report.computed,
        })
    }
}
