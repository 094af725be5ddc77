use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use report_designer::config::DesignerConfig;
use report_designer::events::EventChannel;
use report_designer::registry::WidgetRegistry;
use report_designer::replay::{ReplayError, Replayer, Script};
use report_designer::store::{DesignerStore, ImportError};
use serde_json::{Value, json};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error(transparent)]
    Replay(#[from] ReplayError),
    #[error("invalid layout: {0}")]
    Layout(#[from] ImportError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "report-designer", about = "Report designer core: palette, script replay and layout validation")]
struct Cli {
    /// Undo history depth. Overrides DESIGNER_HISTORY_LIMIT.
    #[arg(long)]
    history_limit: Option<usize>,

    /// Pointer-move throttle in milliseconds. Overrides DESIGNER_DRAG_THROTTLE_MS.
    #[arg(long)]
    drag_throttle_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the built-in widget catalogue as JSON.
    Palette,
    /// Run a designer script and print the exported layout.
    Replay {
        script: PathBuf,
        /// Exit non-zero if any step was rejected.
        #[arg(long)]
        strict: bool,
    },
    /// Check that a saved layout imports cleanly.
    Validate { layout: PathBuf },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = DesignerConfig::from_env();
    if let Some(limit) = cli.history_limit {
        config = config.with_history_limit(limit);
    }
    if let Some(ms) = cli.drag_throttle_ms {
        config = config.with_drag_throttle(Duration::from_millis(ms));
    }

    let result = match cli.command {
        Command::Palette => run_palette(),
        Command::Replay { script, strict } => run_replay(config, &script, strict),
        Command::Validate { layout } => run_validate(config, &layout),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn read(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read { path: path.to_path_buf(), source })
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

fn run_palette() -> Result<ExitCode, CliError> {
    let registry = WidgetRegistry::with_builtin();
    let entries: Vec<Value> = registry
        .descriptors()
        .iter()
        .map(|d| {
            json!({
                "type": d.widget_type(),
                "label": d.label,
                "icon": d.icon,
                "w": d.w,
                "h": d.h,
                "config": d.config.to_fields(),
            })
        })
        .collect();
    print_json(&Value::Array(entries))?;
    Ok(ExitCode::SUCCESS)
}

fn run_replay(config: DesignerConfig, path: &Path, strict: bool) -> Result<ExitCode, CliError> {
    let script = Script::parse(&read(path)?)?;
    let report = Replayer::run(config, &script)?;

    for failure in &report.failures {
        eprintln!("step {} ({}): {}", failure.index, failure.op, failure.message);
    }
    let layout: Value = serde_json::from_str(&report.layout)?;
    print_json(&layout)?;
    eprintln!("applied {} of {} steps", report.applied, script.steps.len());

    if strict && !report.failures.is_empty() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn run_validate(config: DesignerConfig, path: &Path) -> Result<ExitCode, CliError> {
    let raw = read(path)?;
    let mut store = DesignerStore::new(&config, Rc::new(EventChannel::new()));
    let count = store.import_config(&raw)?;
    println!("ok: {count} root widgets, {} total", store.layout().ids().len());
    Ok(ExitCode::SUCCESS)
}
