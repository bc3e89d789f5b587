use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use xkcd_mirror::app::{App, SyncOptions};
use xkcd_mirror::catalog::CatalogHttpClient;
use xkcd_mirror::config::{ConfigLoader, ConfigOverrides};
use xkcd_mirror::domain::DispatchMode;
use xkcd_mirror::error::MirrorError;
use xkcd_mirror::output::{ConsoleOutput, JsonOutput, OutputMode};

#[derive(Parser)]
#[command(name = "xkcd-mirror")]
#[command(about = "Download every xkcd comic missing from a local archive")]
#[command(version, author)]
struct Cli {
    /// Archive directory (default ./xkcdDB/)
    #[arg(short = 'd', long = "dir")]
    archive_root: Option<String>,

    /// Maximum number of parallel downloads (default 20)
    #[arg(short = 'r', long)]
    rate_limit: Option<usize>,

    #[arg(long)]
    dispatch: Option<DispatchMode>,

    #[arg(long)]
    base_url: Option<String>,

    #[arg(long)]
    timeout_secs: Option<u64>,

    /// JSON config file (default xkcd-mirror.json when present)
    #[arg(long)]
    config: Option<String>,

    /// Report missing items without downloading them
    #[arg(long)]
    dry_run: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<MirrorError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &MirrorError) -> u8 {
    match error {
        MirrorError::ConfigRead(_)
        | MirrorError::ConfigParse(_)
        | MirrorError::InvalidConfig(_) => 2,
        MirrorError::Transport { .. }
        | MirrorError::Status { .. }
        | MirrorError::Decode { .. }
        | MirrorError::InvalidIndex(_) => 3,
        MirrorError::Filesystem(_) => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Console
    };

    let overrides = ConfigOverrides {
        archive_root: cli.archive_root,
        rate_limit: cli.rate_limit,
        dispatch: cli.dispatch,
        base_url: cli.base_url,
        timeout_secs: cli.timeout_secs,
    };
    let config = ConfigLoader::resolve(cli.config.as_deref(), overrides)?;
    let client = CatalogHttpClient::from_config(&config)?;
    let app = App::new(config, client);
    let options = SyncOptions {
        dry_run: cli.dry_run,
    };

    match output_mode {
        OutputMode::Console => {
            let report = app.sync(options, &ConsoleOutput)?;
            ConsoleOutput::print_summary(&report).into_diagnostic()?;
        }
        OutputMode::Json => {
            let report = app.sync(options, &JsonOutput)?;
            JsonOutput::print_report(&report).into_diagnostic()?;
        }
    }
    Ok(())
}
