mod app;
mod config;
mod engine;
mod logging;
mod terminal;
mod ui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use faceid_core::{VerificationResult, VerificationStatus};
use faceid_hw::Camera;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use app::App;
use config::Config;
use engine::Engine;

#[derive(Parser)]
#[command(name = "faceid", version, about = "Webcam face verification against a reference gallery")]
struct Cli {
    /// Path to a TOML config file (overrides FACEID_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Live camera view; press v to verify (default)
    Run,
    /// Capture one probe and verify it without the live view
    Verify {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Verify an existing image file instead of a camera capture
    VerifyImage {
        /// Probe image to compare against the gallery
        path: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save one cropped camera frame, e.g. as a new gallery reference
    Snapshot {
        /// Output image path
        path: PathBuf,
    },
    /// List video capture devices
    Devices,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let _guard = logging::init_file(&config.log_dir)?;
            run_interactive(&config)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Verify { json } => {
            logging::init_stderr();
            let mut engine = Engine::open(&config)?;
            let result = engine.verify();
            engine.shutdown();
            report(&result?, json)
        }
        Commands::VerifyImage { path, json } => {
            logging::init_stderr();
            let result = engine::verify_file(&config, &path)?;
            report(&result, json)
        }
        Commands::Snapshot { path } => {
            logging::init_stderr();
            snapshot(&config, &path)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Devices => {
            logging::init_stderr();
            let devices = Camera::list_devices();
            if devices.is_empty() {
                println!("No video capture devices found");
            }
            for d in devices {
                println!("{}  {} ({}, {})", d.path, d.name, d.driver, d.bus);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_interactive(config: &Config) -> Result<()> {
    tracing::info!("faceid starting");
    let engine = Engine::open(config)?;

    let (mut terminal, restore) = match terminal::enter() {
        Ok(setup) => setup,
        Err(e) => {
            engine.shutdown();
            return Err(e.into());
        }
    };

    let mut app = App::new(engine, config.tick());
    let result = app.run(&mut terminal);

    drop(restore);
    app.into_engine().shutdown();
    tracing::info!("faceid shutting down");
    result
}

fn snapshot(config: &Config, path: &Path) -> Result<()> {
    let engine = Engine::open(config)?;
    let result = engine.snapshot(path);
    engine.shutdown();
    let frame = result?;
    println!("Saved {}x{} snapshot to {}", frame.width, frame.height, path.display());
    Ok(())
}

/// Print the label (or JSON) and map the decision to the exit code.
fn report(result: &VerificationResult, json: bool) -> Result<ExitCode> {
    let status = VerificationStatus::from(result);
    if json {
        let out = serde_json::json!({
            "label": status.to_string(),
            "result": result,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{status}");
        println!(
            "detections: {}/{}  ratio: {:.4}",
            result.detections, result.gallery_size, result.ratio
        );
    }

    Ok(if result.verified {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
