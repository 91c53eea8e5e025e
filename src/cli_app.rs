//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::{ArgGroup, Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use registry_residue_helper::core::config::Config;
use registry_residue_helper::core::errors::RrhError;
use registry_residue_helper::logger::jsonl::JsonlConfig;
use registry_residue_helper::logger::tee::{EchoLevel, TeeLogger};
use registry_residue_helper::scanner::rules::Classifier;
use registry_residue_helper::scanner::sweep::{SweepEngine, SweepSummary};
use registry_residue_helper::store::pattern::RootPattern;
use registry_residue_helper::store::snapshot::SnapshotStore;

/// Registry Residue Helper: finds and removes leftover uninstall registrations.
#[derive(Debug, Parser)]
#[command(
    name = "rrh",
    author,
    version,
    about = "Registry Residue Helper - leftover uninstall entry cleanup",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Quiet mode (warnings and errors only on stderr).
    #[arg(short, long, global = true)]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Read-only discovery pass; exports the CSV report.
    Scan(ScanArgs),
    /// Delete matched entries from the store.
    Clean(CleanArgs),
    /// View configuration state.
    Config(ConfigArgs),
    /// Show version and optional build metadata.
    Version(VersionArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

/// Store selection shared by `scan` and `clean`.
#[derive(Debug, Clone, Args, Serialize, Default)]
struct StoreArgs {
    /// Snapshot file to read (falls back to `store.snapshot_file`).
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,
    /// Root pattern to enumerate; repeatable (falls back to `store.roots`).
    #[arg(long = "root", value_name = "PATTERN")]
    roots: Vec<String>,
}

#[derive(Debug, Clone, Args, Serialize, Default)]
struct ScanArgs {
    #[command(flatten)]
    store: StoreArgs,
    /// Report destination (falls back to `report.path`).
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
}

#[derive(Debug, Clone, Args, Serialize, Default)]
#[command(group(ArgGroup::new("intent").required(true).args(["yes", "preview"])))]
struct CleanArgs {
    #[command(flatten)]
    store: StoreArgs,
    /// Confirm deletion of every matched entry.
    #[arg(long)]
    yes: bool,
    /// List what would be removed without touching the store or writing a report.
    #[arg(long)]
    preview: bool,
}

#[derive(Debug, Clone, Args, Serialize, Default)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand, Serialize)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
}

#[derive(Debug, Clone, Args, Serialize, Default)]
struct VersionArgs {
    /// Include additional build metadata fields.
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Operation partially succeeded.
    #[error("{0}")]
    Partial(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
            Self::Partial(_) => 4,
        }
    }
}

impl From<RrhError> for CliError {
    fn from(err: RrhError) -> Self {
        match err {
            RrhError::InvalidConfig { .. }
            | RrhError::MissingConfig { .. }
            | RrhError::ConfigParse { .. }
            | RrhError::InvalidPattern { .. } => Self::User(err.to_string()),
            _ => Self::Runtime(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Scan(args) => run_scan(cli, args),
        Command::Clean(args) => run_clean(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Version(args) => emit_version(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ──────────────────── scan / clean ────────────────────

fn run_scan(cli: &Cli, args: &ScanArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let store = open_store(&config, &args.store)?;
    let report_path = args
        .report
        .clone()
        .unwrap_or_else(|| config.report.path.clone());
    let engine = build_engine(&config, &args.store, report_path)?;
    let mut log = open_log(cli, &config);

    let summary = engine.discover(&store, &mut log);
    emit_summary(cli, "scan", &summary)
}

fn run_clean(cli: &Cli, args: &CleanArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let mut store = open_store(&config, &args.store)?;
    let engine = build_engine(&config, &args.store, config.report.path.clone())?;
    let mut log = open_log(cli, &config);

    if args.preview {
        let summary = engine.without_export().discover(&store, &mut log);
        return emit_summary(cli, "clean --preview", &summary);
    }

    let summary = engine.clean(&mut store, &mut log);
    emit_summary(cli, "clean", &summary)?;
    if summary.failed > 0 {
        return Err(CliError::Partial(format!(
            "cleanup finished with {} of {} removals failed",
            summary.failed, summary.matched
        )));
    }
    Ok(())
}

fn open_store(config: &Config, args: &StoreArgs) -> Result<SnapshotStore, CliError> {
    let path = args
        .snapshot
        .clone()
        .unwrap_or_else(|| config.store.snapshot_file.clone());
    if !path.exists() {
        return Err(CliError::User(format!(
            "snapshot file not found: {} (pass --snapshot or set store.snapshot_file)",
            path.display()
        )));
    }
    Ok(SnapshotStore::open(&path)?)
}

fn build_engine(
    config: &Config,
    args: &StoreArgs,
    report_path: PathBuf,
) -> Result<SweepEngine, CliError> {
    let roots = if args.roots.is_empty() {
        config.store.roots.clone()
    } else {
        for root in &args.roots {
            RootPattern::new(root)?;
        }
        args.roots.clone()
    };
    Ok(SweepEngine::new(
        roots,
        Classifier::new(config.vendor_profile()?),
        report_path,
    ))
}

fn open_log(cli: &Cli, config: &Config) -> TeeLogger {
    let echo = if cli.quiet {
        EchoLevel::Problems
    } else {
        EchoLevel::All
    };
    TeeLogger::open(JsonlConfig::at(&config.paths.jsonl_log), echo)
}

fn emit_summary(cli: &Cli, command: &str, summary: &SweepSummary) -> Result<(), CliError> {
    match output_mode(cli) {
        OutputMode::Human => {
            print_matches(summary);
            print_summary(summary);
            Ok(())
        }
        OutputMode::Json => {
            let payload = json!({
                "command": command,
                "summary": serde_json::to_value(summary)?,
            });
            write_json_line(&payload)
        }
    }
}

fn print_matches(summary: &SweepSummary) {
    if summary.matches.is_empty() {
        println!("No residue entries matched.");
        return;
    }
    println!(
        "{:<48} {:<32} {:<12} {:<3} REASON",
        "PATH", "NAME", "VERSION", "SC"
    );
    for m in &summary.matches {
        let e = &m.entry;
        println!(
            "{:<48} {:<32} {:<12} {:<3} {}",
            truncate(&e.path, 48),
            truncate(e.display_name.as_deref().unwrap_or("-"), 32),
            truncate(e.display_version.as_deref().unwrap_or("-"), 12),
            e.system_component.as_report_str(),
            m.reason(),
        );
    }
}

fn print_summary(summary: &SweepSummary) {
    println!();
    println!(
        "{} pass: {} examined, {} matched",
        summary.mode, summary.examined, summary.matched
    );
    if summary.removed > 0 || summary.failed > 0 {
        println!("  Removed: {}", summary.removed.to_string().green());
    }
    if summary.failed > 0 {
        println!("  Failed: {}", summary.failed.to_string().red());
        for err in &summary.errors {
            eprintln!("    {}: {}", err.path, err.error);
        }
    }
    for root in &summary.failed_roots {
        println!("  {} root not enumerated: {root}", "warning:".yellow());
    }
    if summary.unparseable_versions > 0 {
        println!(
            "  Unparseable versions treated as absent: {}",
            summary.unparseable_versions
        );
    }
    if let Some(path) = &summary.report_path {
        println!("  Report: {}", path.display());
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{keep}...")
}

// ──────────────────── config / version ────────────────────

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            emit_config_path(cli, &path)
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;
            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Runtime(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match Config::load(cli.config.as_deref()) {
            Ok(config) => {
                let hash = config.stable_hash()?;
                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("Configuration is valid.");
                        println!("  Source: {}", config.paths.config_file.display());
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": true,
                            "path": config.paths.config_file.to_string_lossy(),
                            "hash": hash,
                        });
                        write_json_line(&payload)?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => eprintln!("Configuration is INVALID: {e}"),
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": false,
                            "error": e.to_string(),
                            "error_code": e.code(),
                        });
                        write_json_line(&payload)?;
                    }
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
    }
}

fn emit_config_path(cli: &Cli, path: &Path) -> Result<(), CliError> {
    let exists = path.exists();
    match output_mode(cli) {
        OutputMode::Human => {
            println!("{}", path.display());
            if !exists {
                println!("  (file does not exist; defaults will be used)");
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "config path",
                "path": path.to_string_lossy(),
                "exists": exists,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn emit_version(cli: &Cli, args: &VersionArgs) -> Result<(), CliError> {
    let version = env!("CARGO_PKG_VERSION");
    let package = env!("CARGO_PKG_NAME");
    let target = option_env!("TARGET").unwrap_or("unknown");
    let profile = option_env!("PROFILE").unwrap_or("unknown");
    let git_sha = option_env!("GIT_SHA").unwrap_or("unknown");

    match output_mode(cli) {
        OutputMode::Human => {
            println!("rrh {version}");
            if args.verbose {
                println!("package: {package}");
                println!("target: {target}");
                println!("profile: {profile}");
                println!("git_sha: {git_sha}");
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "binary": "rrh",
                "version": version,
                "package": package,
                "build": {
                    "target": target,
                    "profile": profile,
                    "git_sha": git_sha,
                }
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ──────────────────── output ────────────────────

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("RRH_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
