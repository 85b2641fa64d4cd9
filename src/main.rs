use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod model;
mod services;

use config::Config;
use model::slides;
use services::{batch, generation::IdeogramClient};

/// Generates slide background images through the Ideogram API.
#[derive(Debug, Parser)]
#[command(name = "slide-assets", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate backgrounds for every slide (the default).
    Generate {
        /// Directory the PNG files are written to.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Number of concurrent requests, 1 to 4.
        #[arg(long)]
        workers: Option<usize>,

        /// Only generate the named slides. May be repeated.
        #[arg(long = "only", value_name = "NAME")]
        only: Vec<String>,
    },

    /// Print the built-in slide list.
    List,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slide_assets=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Generate {
        output_dir: None,
        workers: None,
        only: Vec::new(),
    }) {
        Command::List => {
            for job in slides::SLIDES {
                println!("{:<24} {:<28} {}", job.name, job.file_name(), job.prompt);
            }
            ExitCode::SUCCESS
        }
        Command::Generate {
            output_dir,
            workers,
            only,
        } => generate(output_dir, workers, only),
    }
}

fn generate(output_dir: Option<PathBuf>, workers: Option<usize>, only: Vec<String>) -> ExitCode {
    let jobs = match slides::select(&only) {
        Ok(jobs) => jobs,
        Err(unknown) => unknown_slide_error(&unknown).exit(),
    };

    let cfg = match Config::from_env().and_then(|c| c.with_overrides(output_dir, workers)) {
        Ok(cfg) => cfg,
        Err(e) => return fatal("configuration error", &e),
    };

    let client = match IdeogramClient::new(&cfg) {
        Ok(c) => c,
        Err(e) => return fatal("failed to build HTTP client", &e),
    };

    let stdout = Mutex::new(io::stdout());
    match batch::run(&jobs, &client, &cfg.output_dir, cfg.workers, &stdout) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => fatal("batch aborted", &e),
    }
}

fn unknown_slide_error(unknown: &str) -> clap::Error {
    let valid: Vec<&str> = slides::SLIDES.iter().map(|s| s.name).collect();
    Cli::command().error(
        ErrorKind::InvalidValue,
        format!("unknown slide '{unknown}' for '--only'; valid names: {}", valid.join(", ")),
    )
}

/// Logs and prints a fatal error. stderr gets the line even when tracing is
/// filtered off.
fn fatal(context: &str, err: &dyn std::error::Error) -> ExitCode {
    tracing::error!(error = %err, "{}", context);
    eprintln!("{}", fatal_message(context, err));
    ExitCode::FAILURE
}

fn fatal_message(context: &str, err: &dyn std::error::Error) -> String {
    format!("slide-assets: {context}: {err}")
}
