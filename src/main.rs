use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use file_generation_tool::config::Config;
use file_generation_tool::{Outcome, SessionController, SessionEvent};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "file_generation_tool")]
#[command(about = "generate large ASCII filler files with progress, speed and ETA")]
struct Cli {
    /// Folder the file is written into
    #[arg(short, long)]
    dir: Option<String>,

    /// Size value, e.g. 26 or 1.5
    #[arg(short, long)]
    size: Option<String>,

    /// MB or GB (binary multiples)
    #[arg(short, long)]
    unit: Option<String>,

    /// File name inside the folder
    #[arg(short, long)]
    name: Option<String>,

    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Print every event as a JSON line
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load_from_file(&cli.config);
    if let Some(name) = cli.name {
        config.file_name = name;
    }

    let folder = cli.dir.unwrap_or_else(|| config.output_dir.clone());
    let size = cli.size.unwrap_or_else(|| config.default_size.to_string());
    let unit = cli.unit.unwrap_or_else(|| config.default_unit.to_string());

    let controller = SessionController::new(config);
    let handle = match controller.start_from_input(&folder, &size, &unit) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Invalid input: {}", e);
            return ExitCode::from(2);
        }
    };

    let token = handle.cancel_token();
    if let Err(err) = ctrlc::set_handler(move || token.cancel()) {
        warn!(%err, "failed to install Ctrl+C handler, run cannot be stopped early");
    }

    for event in handle.events().iter() {
        if cli.json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(err) => warn!(%err, "failed to encode event"),
            }
        } else if let SessionEvent::Progress(snapshot) = &event {
            print!("\r{}    ", snapshot);
            let _ = io::stdout().flush();
        }
        if matches!(event, SessionEvent::Finished(_)) {
            break;
        }
    }

    let outcome = handle.wait();
    if !cli.json {
        println!();
        println!("{}", outcome);
        let left_behind = matches!(
            outcome,
            Outcome::CleanupFailed { .. } | Outcome::Failed { .. }
        );
        if left_behind && outcome.bytes_written() > 0 {
            eprintln!("Partial file left at {}", outcome.path().display());
        }
    }

    match outcome {
        Outcome::Completed { .. } => ExitCode::SUCCESS,
        Outcome::Cancelled { .. } => ExitCode::from(130),
        Outcome::CleanupFailed { .. } | Outcome::Failed { .. } => ExitCode::FAILURE,
    }
}
