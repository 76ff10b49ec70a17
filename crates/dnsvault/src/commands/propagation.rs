//! Propagation command handler.

use tabled::Tabled;

use dnsvault_core::{Engine, PropagationReport, ResolverCheck};

use crate::cli::{GlobalOpts, PropagationArgs};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util;

#[derive(Tabled)]
struct ResolverRow {
    #[tabled(rename = "Resolver")]
    resolver: String,
    #[tabled(rename = "Match")]
    matches: String,
    #[tabled(rename = "Answers")]
    values: String,
}

impl From<&ResolverCheck> for ResolverRow {
    fn from(c: &ResolverCheck) -> Self {
        let values = match &c.error {
            Some(error) => format!("error: {error}"),
            None if c.values.is_empty() => "-".into(),
            None => c
                .values
                .iter()
                .map(|v| util::truncate(v, 48))
                .collect::<Vec<_>>()
                .join("\n"),
        };
        Self {
            resolver: c.resolver.to_string(),
            matches: if c.matches { "yes" } else { "no" }.into(),
            values,
        }
    }
}

fn summary(r: &PropagationReport) -> String {
    format!(
        "{} {}: {}/{} resolvers ({}%)",
        r.record_type,
        r.name,
        r.propagated(),
        r.total(),
        (r.propagated() * 100).checked_div(r.total()).unwrap_or(0)
    )
}

fn detail(r: &PropagationReport, painter: Painter) -> String {
    let expected = r.expected.clone().unwrap_or_else(|| "(no answers)".into());
    let rows: Vec<ResolverRow> = r.resolvers.iter().map(ResolverRow::from).collect();
    let line = if r.is_complete() {
        painter.added(&summary(r))
    } else {
        painter.warn(&summary(r))
    };
    format!(
        "{}\n\n{}\n\n{line}",
        output::detail_lines(&[("Expected", expected)]),
        output::render_table(&rows)
    )
}

fn plain(r: &PropagationReport) -> String {
    r.resolvers
        .iter()
        .map(|c| format!("{}\t{}", c.resolver, if c.matches { "yes" } else { "no" }))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

/// Report per resolver; exits non-zero while any resolver still disagrees.
pub async fn handle(engine: &Engine, args: PropagationArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let spinner = util::spinner(global, "Querying resolvers");
    let result = engine
        .propagation(&args.record_type, args.name.as_deref(), args.expected.as_deref())
        .await;
    spinner.finish_and_clear();
    let report = result?;

    let painter = Painter::new(&global.color);
    let out = output::render_single(&global.output, &report, |r| detail(r, painter), plain)?;
    output::print_output(&out, global.quiet);

    if report.is_complete() {
        Ok(())
    } else {
        Err(CliError::NotPropagated {
            pending: report.total() - report.propagated(),
            total: report.total(),
        })
    }
}
