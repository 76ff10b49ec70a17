//! Archive command handler.

use dnsvault_core::Engine;

use crate::cli::{ArchiveArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(engine: &Engine, args: &ArchiveArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let moved = engine.archive(args.days)?;
    let days = args.days.unwrap_or(engine.config().retention_days);

    if !global.quiet {
        eprintln!(
            "Archived {} snapshots older than {days} days to {}",
            moved.len(),
            engine.store().archive_dir().display()
        );
    }

    let paths: Vec<String> = moved.iter().map(|p| p.display().to_string()).collect();
    let out = output::render_single(&global.output, &paths, |p| p.join("\n"), |p| p.join("\n"))?;
    output::print_output(&out, global.quiet);
    Ok(())
}
