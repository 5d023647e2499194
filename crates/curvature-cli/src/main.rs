//! Curvature - symbolic curvature tensors from the command line
//!
//! ## Commands
//!
//! - `run`: compute every derived tensor of a metric and print it
//! - `presets`: list the bundled metrics
//! - `preset`: print one bundled metric definition

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use curvature_core::{MetricPreset, OutputRecord, RenderStyle};
use curvature_pipeline::{
    PipelineConfig, PipelineController, PipelineMessage, ProgressEvent, RunInput, RunResult,
    RunState,
};
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "curvature")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Symbolic curvature tensors for general relativity", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute metric, inverse, Christoffel, Ricci, Einstein and divergence
    Run(RunArgs),

    /// List bundled metric presets
    Presets,

    /// Print the definition of a bundled preset
    Preset {
        /// Preset name (see `curvature presets`)
        name: MetricPreset,
    },
}

#[derive(clap::Args)]
struct RunArgs {
    /// Comma-separated coordinate names (defaults to the preset's)
    #[arg(short, long)]
    coords: Option<String>,

    /// Comma-separated parameter names (defaults to the preset's)
    #[arg(short, long)]
    params: Option<String>,

    /// Metric-definition file
    #[arg(short, long, conflicts_with = "preset", required_unless_present = "preset")]
    metric: Option<PathBuf>,

    /// Bundled metric to use instead of a file
    #[arg(long)]
    preset: Option<MetricPreset>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, env = "CURVATURE_FORMAT")]
    format: OutputFormat,

    /// Cancel the calculation after this many seconds
    #[arg(long, env = "CURVATURE_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Do not report progress on stderr
    #[arg(long)]
    no_progress: bool,

    /// Skip the Christoffel section of the output
    #[arg(long)]
    no_christoffel: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Latex,
    Json,
}

impl OutputFormat {
    fn render_style(self) -> RenderStyle {
        match self {
            OutputFormat::Latex => RenderStyle::Latex,
            OutputFormat::Text | OutputFormat::Json => RenderStyle::Plain,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    curvature_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run(args) => {
            let input = resolve_input(
                args.coords.as_deref(),
                args.params.as_deref(),
                args.metric.as_deref(),
                args.preset,
            )?;
            let config = PipelineConfig::default()
                .with_render(args.format.render_style())
                .with_christoffel(!args.no_christoffel);
            let options = RunOptions {
                format: args.format,
                timeout: args.timeout_secs.map(Duration::from_secs),
                progress: !args.no_progress,
            };
            let mut stdout = std::io::stdout();
            let result = cmd_run(config, input, &options, &mut stdout).await?;
            Ok(ExitCode::from(exit_code(result.state)))
        }
        Commands::Presets => {
            cmd_presets();
            Ok(ExitCode::SUCCESS)
        }
        Commands::Preset { name } => {
            cmd_preset(name);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Build the run input from a metric file or a preset.
fn resolve_input(
    coords: Option<&str>,
    params: Option<&str>,
    metric: Option<&Path>,
    preset: Option<MetricPreset>,
) -> Result<RunInput> {
    match (metric, preset) {
        (Some(path), _) => {
            let coords = coords.context("--coords is required with --metric")?;
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read metric definition: {:?}", path))?;
            Ok(RunInput::new(coords, params.unwrap_or_default(), source))
        }
        (None, Some(preset)) => Ok(RunInput::new(
            coords.unwrap_or(preset.coords()),
            params.unwrap_or(preset.params()),
            preset.source(),
        )),
        (None, None) => anyhow::bail!("either --metric or --preset is required"),
    }
}

struct RunOptions {
    format: OutputFormat,
    timeout: Option<Duration>,
    progress: bool,
}

/// Submit one run and print its records as they arrive.
///
/// Ctrl-C or an elapsed timeout requests cancellation; the run still ends
/// with its terminal record.
async fn cmd_run(
    config: PipelineConfig,
    input: RunInput,
    options: &RunOptions,
    out: &mut impl Write,
) -> Result<RunResult> {
    let controller = PipelineController::new(config);
    let mut handle = controller
        .submit(input)
        .context("Failed to start calculation")?;
    let cancel = handle.cancel_handle();
    info!(run_id = %handle.run_id(), "calculation started");

    let deadline = async {
        match options.timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let mut cancel_requested = false;
    let mut progress_shown = false;

    loop {
        tokio::select! {
            message = handle.next_message() => {
                let Some(message) = message else { break };
                match message {
                    PipelineMessage::Progress(event) => {
                        if options.progress {
                            report_progress(event);
                            progress_shown = true;
                        }
                    }
                    PipelineMessage::Record(record) => {
                        writeln!(out, "{}", format_record(&record, options.format)?)
                            .context("Failed to write output")?;
                    }
                    PipelineMessage::Terminal(result) => {
                        if options.format == OutputFormat::Json {
                            let summary = serde_json::to_string(&result.summary())?;
                            writeln!(out, "{summary}").context("Failed to write output")?;
                        }
                    }
                }
            }
            _ = &mut interrupt, if !cancel_requested => {
                warn!("interrupt received, cancelling calculation");
                cancel.cancel();
                cancel_requested = true;
            }
            _ = &mut deadline, if !cancel_requested => {
                warn!(timeout_secs = options.timeout.map(|d| d.as_secs()), "timeout elapsed, cancelling calculation");
                cancel.cancel();
                cancel_requested = true;
            }
        }
    }
    if progress_shown {
        eprintln!();
    }
    out.flush().context("Failed to write output")?;

    let result = handle.wait().await?;
    info!(
        run_id = %result.run_id,
        state = %result.state,
        duration_ms = result.duration_ms(),
        digest = %result.records_digest,
        "calculation ended"
    );
    Ok(result)
}

fn report_progress(event: ProgressEvent) {
    eprint!("\r[{:>3}%] {:<16}", event.percent, event.stage.name());
}

fn format_record(record: &OutputRecord, format: OutputFormat) -> Result<String> {
    Ok(match (format, record) {
        (OutputFormat::Json, _) => serde_json::to_string(record)?,
        (
            OutputFormat::Latex,
            OutputRecord::Component {
                tensor,
                indices,
                expression,
            },
        ) => format!("{} = {}", tensor.latex_label(indices), expression),
        _ => record.to_string(),
    })
}

fn exit_code(state: RunState) -> u8 {
    match state {
        RunState::Completed => 0,
        RunState::Cancelled => 130,
        RunState::Idle | RunState::Running | RunState::Failed => 1,
    }
}

fn cmd_presets() {
    println!("Available presets:");
    for preset in MetricPreset::ALL {
        println!("  {:<14} {}", preset.name(), preset.description());
    }
}

fn cmd_preset(preset: MetricPreset) {
    println!("# preset:      {}", preset.name());
    println!("# coordinates: {}", preset.coords());
    let params = preset.params();
    println!(
        "# parameters:  {}",
        if params.is_empty() { "(none)" } else { params }
    );
    print!("{}", preset.source());
}
