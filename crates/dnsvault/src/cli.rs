//! Clap derive structures for the `dnsvault` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// dnsvault -- checksummed DNS backups you can diff and restore
#[derive(Debug, Parser)]
#[command(
    name = "dnsvault",
    version,
    about = "Back up, verify, diff, and restore DNS records",
    long_about = "Captures a domain's DNS records from Cloudflare, a cPanel host, and\n\
        public resolvers into checksummed snapshots. Snapshots can be listed,\n\
        verified, compared, archived, and restored back to a provider.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Domain profile to use
    #[arg(long, short = 'p', env = "DNSVAULT_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file (default: platform config dir)
    #[arg(long, env = "DNSVAULT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Domain to operate on (overrides profile)
    #[arg(long, short = 'd', env = "DNSVAULT_DOMAIN", global = true)]
    pub domain: Option<String>,

    /// Snapshot directory (overrides profile)
    #[arg(long, env = "DNSVAULT_BACKUP_DIR", global = true)]
    pub backup_dir: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "DNSVAULT_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates from the cPanel host
    #[arg(long, short = 'k', env = "DNSVAULT_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "DNSVAULT_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Source & Provider Enums ──────────────────────────────────────────

/// What `backup` captures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum BackupSource {
    /// Every source, merged into one unified snapshot
    #[default]
    All,
    /// Same as `all`
    Unified,
    /// Cloudflare zone only
    Cloudflare,
    /// cPanel (Canspace) zone only
    Canspace,
    /// Public resolvers only
    #[value(alias = "dig")]
    Public,
}

/// A provider records can be written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderArg {
    Cloudflare,
    Canspace,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Capture a snapshot (all sources by default)
    #[command(alias = "b")]
    Backup(BackupArgs),

    /// List snapshots from the last N days
    #[command(alias = "ls")]
    List(ListArgs),

    /// Check a snapshot's checksum
    Verify(FileArgs),

    /// Diff two snapshots
    #[command(alias = "diff")]
    Compare(CompareArgs),

    /// Print a snapshot's records
    Show(FileArgs),

    /// Apply a snapshot back to a provider (dry run unless --no-dry-run)
    Restore(RestoreArgs),

    /// Move snapshots older than N days into the archive directory
    Archive(ArchiveArgs),

    /// Remove snapshots that duplicate an older one
    Cleanup,

    /// Copy records from one provider to the others
    Sync(SyncArgs),

    /// Compare what the configured providers currently serve
    Drift,

    /// Apply an updates file (JSON) to the providers
    Bulk(BulkArgs),

    /// Print an updates file to edit and pass to `bulk`
    Template(TemplateArgs),

    /// Check whether each public resolver serves a record's value
    #[command(alias = "prop")]
    Propagation(PropagationArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SNAPSHOTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct BackupArgs {
    /// Source to capture (`dig` is accepted for `public`)
    #[arg(value_enum, default_value = "all")]
    pub source: BackupSource,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only snapshots taken within this many days
    #[arg(default_value = "30")]
    pub days: u32,
}

/// A snapshot reference: a path, a file name in the backup dir,
/// `latest`, or `latest_<label>`.
#[derive(Debug, Args)]
pub struct FileArgs {
    /// Snapshot file
    pub file: String,
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Older snapshot
    pub file1: String,

    /// Newer snapshot
    pub file2: String,
}

#[derive(Debug, Args)]
pub struct RestoreArgs {
    /// Snapshot file
    pub file: String,

    /// Actually write to the provider (takes a pre-restore snapshot first)
    #[arg(long)]
    pub no_dry_run: bool,

    /// Destination provider (default: the snapshot's own, else cloudflare)
    #[arg(long, value_enum)]
    pub provider: Option<ProviderArg>,
}

#[derive(Debug, Args)]
pub struct ArchiveArgs {
    /// Archive snapshots older than this many days (default: profile retention)
    pub days: Option<u32>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PROVIDERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Provider to copy from
    #[arg(long, value_enum, default_value = "cloudflare")]
    pub from: ProviderArg,

    /// Provider to copy to (default: every other configured provider)
    #[arg(long, value_enum)]
    pub to: Option<ProviderArg>,

    /// Report what would be written without writing it
    #[arg(long)]
    pub dry_run: bool,
}

/// Ready-made updates files for `template`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PresetArg {
    /// One entry of each kind, to edit by hand
    #[default]
    Sample,
    /// Apex A and www CNAME for Vercel
    Vercel,
    /// GitHub Pages apex addresses and www CNAME (needs --github-user)
    GithubPages,
    /// Google Workspace MX set and SPF
    GoogleWorkspace,
    /// Microsoft 365 MX and SPF
    Office365,
}

#[derive(Debug, Args)]
pub struct BulkArgs {
    /// JSON array of {action, type, name, value, ttl?, proxied?, priority?}
    pub file: PathBuf,

    /// Apply to this provider only (default: every configured provider)
    #[arg(long, value_enum)]
    pub provider: Option<ProviderArg>,

    /// Report what would be written without writing it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct TemplateArgs {
    /// Which updates file to print
    #[arg(value_enum, default_value = "sample")]
    pub preset: PresetArg,

    /// GitHub account for the github-pages preset
    #[arg(long)]
    pub github_user: Option<String>,
}

#[derive(Debug, Args)]
pub struct PropagationArgs {
    /// Value to look for (default: the first answer any resolver gives)
    pub expected: Option<String>,

    /// Record type
    #[arg(long = "type", short = 't', default_value = "A")]
    pub record_type: String,

    /// Record name, relative to the domain (default: the apex)
    #[arg(long, short = 'n')]
    pub name: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Secrets `set-secret` can store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SecretKind {
    CloudflareToken,
    CanspacePassword,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a secret in the system keyring
    SetSecret {
        /// Which secret to store
        #[arg(value_enum)]
        secret: SecretKind,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
