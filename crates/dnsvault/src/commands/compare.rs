//! Compare command handler.

use std::collections::BTreeSet;

use dnsvault_core::{Comparison, Engine};

use crate::cli::{CompareArgs, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, Painter};

/// Entries shown per section before collapsing into "... and N more".
const PREVIEW: usize = 5;

fn section(lines: &mut Vec<String>, keys: &BTreeSet<String>, sign: &str, paint: impl Fn(&str) -> String) {
    for key in keys.iter().take(PREVIEW) {
        lines.push(format!("  {}", paint(&format!("{sign} {key}"))));
    }
    if keys.len() > PREVIEW {
        lines.push(format!("  ... and {} more", keys.len() - PREVIEW));
    }
}

fn detail(c: &Comparison, painter: Painter) -> String {
    let mut lines = vec![
        painter.heading(&format!("{} -> {}", c.file1, c.file2)),
        painter.dim(&format!("{} -> {}", c.date1, c.date2)),
        String::new(),
    ];

    if c.diff.is_empty() {
        lines.push(format!("No changes ({} records)", c.diff.unchanged.len()));
        return lines.join("\n");
    }

    lines.push(format!(
        "{} added, {} removed, {} unchanged",
        c.diff.added.len(),
        c.diff.removed.len(),
        c.diff.unchanged.len()
    ));
    section(&mut lines, &c.diff.added, "+", |t| painter.added(t));
    section(&mut lines, &c.diff.removed, "-", |t| painter.removed(t));
    lines.join("\n")
}

/// `+key` / `-key` lines for scripting.
fn plain(c: &Comparison) -> String {
    c.diff
        .added
        .iter()
        .map(|k| format!("+{k}"))
        .chain(c.diff.removed.iter().map(|k| format!("-{k}")))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(engine: &Engine, args: &CompareArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let comparison = engine.compare(&args.file1, &args.file2)?;
    let painter = Painter::new(&global.color);

    let out = output::render_single(&global.output, &comparison, |c| detail(c, painter), plain)?;
    output::print_output(&out, global.quiet);
    Ok(())
}
