//! Template command handler.

use dnsvault_core::{Engine, bulk};

use crate::cli::TemplateArgs;
use crate::error::CliError;

use super::util;

/// Print an updates file for the profile's domain. Always JSON, since that
/// is what `bulk` reads back.
pub fn handle(engine: &Engine, args: &TemplateArgs) -> Result<(), CliError> {
    let updates = bulk::template(
        util::preset(args.preset),
        &engine.config().domain,
        args.github_user.as_deref(),
    )?;
    let out = serde_json::to_string_pretty(&updates).map_err(|e| CliError::Render(e.to_string()))?;
    println!("{out}");
    Ok(())
}
