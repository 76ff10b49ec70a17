//! Command dispatch: bridges CLI args -> engine calls -> output formatting.

pub mod archive;
pub mod backup;
pub mod bulk;
pub mod cleanup;
pub mod compare;
pub mod config_cmd;
pub mod drift;
pub mod list;
pub mod propagation;
pub mod restore;
pub mod show;
pub mod sync;
pub mod template;
pub mod util;
pub mod verify;

use dnsvault_core::Engine;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch an engine-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, engine: &Engine, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Backup(args) => backup::handle(engine, args, global).await,
        Command::List(args) => list::handle(engine, &args, global),
        Command::Verify(args) => verify::handle(engine, &args, global),
        Command::Compare(args) => compare::handle(engine, &args, global),
        Command::Show(args) => show::handle(engine, &args, global),
        Command::Restore(args) => restore::handle(engine, args, global).await,
        Command::Archive(args) => archive::handle(engine, &args, global),
        Command::Cleanup => cleanup::handle(engine, global),
        Command::Sync(args) => sync::handle(engine, args, global).await,
        Command::Drift => drift::handle(engine, global).await,
        Command::Bulk(args) => bulk::handle(engine, args, global).await,
        Command::Template(args) => template::handle(engine, &args),
        Command::Propagation(args) => propagation::handle(engine, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
