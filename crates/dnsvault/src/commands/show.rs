//! Show command handler.

use dnsvault_core::Engine;

use crate::cli::{FileArgs, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util::RecordRow;

// ── Handler ─────────────────────────────────────────────────────────

/// Print a snapshot's unified records. A checksum mismatch is reported but
/// does not stop the listing.
pub fn handle(engine: &Engine, args: &FileArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let doc = engine.load(&args.file)?;
    let verification = doc.verify();
    if !verification.is_intact() && !global.quiet {
        let painter = Painter::new(&global.color);
        eprintln!(
            "{}",
            painter.warn(&format!(
                "Warning: {} does not match its checksum; contents may have been altered",
                doc.path.display()
            ))
        );
    }

    let records = doc.records()?;
    let out = output::render_list(&global.output, &records, |r| RecordRow::from(r), |r| {
        r.key().to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
