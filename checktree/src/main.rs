//! Sequential check-tree runner.
//!
//! Loads a work tree manifest, runs every command in it once, in order, and
//! prints the resulting report tree. The exit code reflects the root report.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use checktree::diagnostics::{Diagnostic, Diagnostics};
use checktree::io::config::{CONFIG_FILE, CheckTreeConfig, ColorMode, load_config, write_config};
use checktree::io::manifest::{ManifestOptions, load_manifest};
use checktree::render::{RenderOptions, render, render_summary};
use checktree::scheduler::Scheduler;
use checktree::selftest::{self_test_tree, verify};
use checktree::{Aggregate, Report, Summary, exit_codes, logging};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "checktree",
    version,
    about = "Run a tree of checks one at a time and report the results"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a work tree manifest (`.json` or `.toml`).
    Run {
        manifest: PathBuf,
        /// Config file. Defaults to `checktree.toml` when present.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Override the configured color mode.
        #[arg(long, value_enum)]
        color: Option<ColorMode>,
    },
    /// Run the built-in self-test tree and verify the report.
    SelfTest {
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Create `checktree.toml` with default settings.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    report: &'a Report,
    summary: Summary,
    diagnostics: Vec<Diagnostic>,
}

fn main() {
    logging::init("warn");
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;
    match cli.command {
        Command::Run {
            manifest,
            config,
            format,
            color,
        } => runtime.block_on(cmd_run(&manifest, config.as_deref(), format, color)),
        Command::SelfTest { format } => runtime.block_on(cmd_self_test(format)),
        Command::Init { force } => cmd_init(force),
    }
}

async fn cmd_run(
    manifest: &Path,
    config: Option<&Path>,
    format: Format,
    color: Option<ColorMode>,
) -> Result<i32> {
    let mut cfg = match config {
        Some(path) if !path.exists() => bail!("config file {} not found", path.display()),
        Some(path) => load_config(path)?,
        None => load_config(Path::new(CONFIG_FILE))?,
    };
    if let Some(color) = color {
        cfg.render.color = color;
    }

    let cwd = manifest
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let options = ManifestOptions {
        cwd,
        output_limit_bytes: cfg.commands.output_limit_bytes,
    };
    let tree = load_manifest(manifest, &options)?;

    let diagnostics = Diagnostics::new();
    let report = Scheduler::new(diagnostics.clone())
        .run(&tree)
        .await
        .with_context(|| format!("run {}", manifest.display()))?;

    let failed = report.failed();
    print_report(report, format, &cfg.render.options(), &diagnostics)?;
    info!(failed, "run complete");
    Ok(if failed {
        exit_codes::FAILED
    } else {
        exit_codes::OK
    })
}

async fn cmd_self_test(format: Format) -> Result<i32> {
    let diagnostics = Diagnostics::new();
    let report = Scheduler::new(diagnostics.clone())
        .run(&self_test_tree().into())
        .await
        .context("run self-test tree")?;

    let mismatches = verify(&report);
    let render_cfg = CheckTreeConfig::default().render;
    print_report(report, format, &render_cfg.options(), &diagnostics)?;

    if mismatches.is_empty() {
        eprintln!("self-test: report matches expectations");
        return Ok(exit_codes::OK);
    }
    for mismatch in &mismatches {
        eprintln!("self-test mismatch: {mismatch}");
    }
    Ok(exit_codes::FAILED)
}

fn cmd_init(force: bool) -> Result<i32> {
    let path = Path::new(CONFIG_FILE);
    if path.exists() && !force {
        println!("{} already exists (use --force to overwrite)", path.display());
        return Ok(exit_codes::OK);
    }
    write_config(path, &CheckTreeConfig::default())?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

fn print_report(
    report: Aggregate,
    format: Format,
    options: &RenderOptions,
    diagnostics: &Diagnostics,
) -> Result<()> {
    let report = Report::Aggregate(report);
    let summary = Summary::of(&report);
    match format {
        Format::Text => {
            print!("{}", render(&report, options));
            println!("{}", render_summary(&summary, options));
            if !diagnostics.is_empty() {
                warn!(
                    count = diagnostics.error_count(),
                    "run recorded contract violations"
                );
            }
        }
        Format::Json => {
            let output = JsonOutput {
                report: &report,
                summary,
                diagnostics: diagnostics.entries(),
            };
            let payload = serde_json::to_string_pretty(&output).context("serialize report")?;
            println!("{payload}");
        }
    }
    Ok(())
}
