use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docgate::cli::commands::{analyze, config, generate, validate};
use docgate::config::{OutputFormat, ProjectType};
use docgate::types::IssueSeverity;

fn parse_severity(s: &str) -> Result<IssueSeverity, String> {
    match s.to_lowercase().as_str() {
        "error" => Ok(IssueSeverity::Error),
        "warning" => Ok(IssueSeverity::Warning),
        "missing" | "all" => Ok(IssueSeverity::Missing),
        _ => Err(format!(
            "Invalid severity '{}'. Valid values: error, warning, missing",
            s
        )),
    }
}

fn parse_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("threshold must be between 0.0 and 1.0, got {}", value))
    }
}

#[derive(Parser)]
#[command(name = "docgate")]
#[command(
    version,
    about = "Quality-gated documentation generator with semantic validation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file replacing .docgate/config.toml
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate documentation through the refinement loop
    Generate {
        #[arg(help = "Project directory (default: current directory)")]
        path: Option<PathBuf>,
        #[arg(long, short, help = "Output file")]
        output: Option<PathBuf>,
        #[arg(long, short = 'f', help = "Output format: markdown, html")]
        format: Option<OutputFormat>,
        #[arg(long, help = "Model to use")]
        model: Option<String>,
        #[arg(long, value_parser = parse_threshold, help = "Quality threshold (0.0-1.0)")]
        threshold: Option<f64>,
        #[arg(long, help = "Maximum refinement iterations")]
        max_iterations: Option<u32>,
    },

    /// Show graph metrics and detected patterns without generating
    Analyze {
        #[arg(help = "Project directory (default: current directory)")]
        path: Option<PathBuf>,
        #[arg(long, default_value = "10", help = "Central files to list")]
        top: usize,
        #[arg(long, help = "Print JSON instead of text")]
        json: bool,
        #[arg(long, help = "Project type override: frontend, backend, mixed")]
        project_type: Option<ProjectType>,
    },

    /// Validate an existing document against the source
    Validate {
        #[arg(help = "Documentation file")]
        document: PathBuf,
        #[arg(help = "Project directory (default: current directory)")]
        path: Option<PathBuf>,
        #[arg(long, default_value = "missing", value_parser = parse_severity, help = "Lowest severity to print: error, warning, missing")]
        severity: IssueSeverity,
        #[arg(long, help = "Print issues as JSON")]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Write a project configuration file
    Init {
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mdocgate encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            if let Some(completed) = e
                .downcast_ref::<docgate::DocGateError>()
                .and_then(|e| e.iterations_completed())
            {
                eprintln!("  Completed iterations before failure: {}", completed);
            }
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Generate {
            path,
            output,
            format,
            model,
            threshold,
            max_iterations,
        } => {
            generate::run(generate::GenerateOptions {
                path,
                config: cli.config,
                output,
                format,
                model,
                threshold,
                max_iterations,
                quiet: cli.quiet,
            })?;
        }
        Commands::Analyze {
            path,
            top,
            json,
            project_type,
        } => {
            analyze::run(analyze::AnalyzeOptions {
                path,
                config: cli.config,
                top,
                json,
                project_type,
            })?;
        }
        Commands::Validate {
            document,
            path,
            severity,
            json,
        } => {
            let counts = validate::run(validate::ValidateOptions {
                document,
                path,
                config: cli.config,
                severity,
                json,
            })?;
            if counts.errors > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => config::show(cli.config.as_ref(), &format)?,
            ConfigAction::Path => config::path()?,
            ConfigAction::Init { force } => config::init(force)?,
        },
    }

    Ok(ExitCode::SUCCESS)
}
