//! # ffwrap - Main Entry Point
//!
//! ## Responsibilities:
//! - Parse the command line with `clap`
//! - Initialize `tracing` logging (INFO, or DEBUG with `--verbose`)
//! - Load configuration and dispatch to probe / convert / tools
//!
//! ## Usage:
//! ```bash
//! ffwrap probe clip.mp4
//! ffwrap convert clip.mp4 small.mp4 -- -ss 00:01:30 -c:v libx264 -crf 20
//! ffwrap tools
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ffmpeg_wrapper::config::TokenizerKind;
use ffmpeg_wrapper::events::JsonEvent;
use ffmpeg_wrapper::progress::ProgressReporter;
use ffmpeg_wrapper::{Config, ConversionSupervisor, MediaFile, MetadataProber, ToolResolver};

#[derive(Parser)]
#[command(name = "ffwrap")]
#[command(about = "Probe media files and run ffmpeg conversions with live progress")]
struct Args {
    /// Config file (default: <config dir>/ffwrap/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print ffprobe metadata as JSON
    Probe {
        /// Media file
        file: PathBuf,
    },

    /// Convert a file with ffmpeg, showing progress
    Convert {
        /// Source media file
        input: PathBuf,

        /// Output file; relative names land next to the source
        output: PathBuf,

        /// Print one JSON object per event instead of a spinner
        #[arg(long)]
        json: bool,

        /// Group stats words seven at a time instead of splitting lines
        #[arg(long)]
        legacy_stats: bool,

        /// Extra ffmpeg arguments, after `--`
        #[arg(last = true)]
        ffmpeg_args: Vec<String>,
    },

    /// Show where ffmpeg and ffprobe were found
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = Config::load(args.config.as_deref()).await?;

    match args.command {
        Commands::Probe { file } => {
            let prober = MetadataProber::new(ToolResolver::new(&config));
            let media = MediaFile::probe(&file, &prober).await?;
            if let Some(metadata) = media.metadata() {
                println!("{}", serde_json::to_string_pretty(metadata)?);
            }
        }

        Commands::Convert {
            input,
            output,
            json,
            legacy_stats,
            ffmpeg_args,
        } => {
            if legacy_stats {
                config.tokenizer = TokenizerKind::StatsWords;
            }

            let media = MediaFile::open(&input)?;
            let mut events = ConversionSupervisor::new(&config).convert(&media, &output, &ffmpeg_args)?;

            let label = media
                .path()
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| media.path().display().to_string());
            let mut reporter = (!json).then(|| ProgressReporter::new(&label));
            let mut failure = None;

            while let Some(event) = events.recv().await {
                match reporter {
                    Some(ref mut reporter) => reporter.update(&event),
                    None => println!("{}", JsonEvent::from(&event).to_json()?),
                }
                if let Some(err) = event.failure() {
                    failure = Some(err.clone());
                }
            }

            if let Some(err) = failure {
                return Err(err.into());
            }
            info!("Conversion of {} finished", label);
        }

        Commands::Tools => {
            print!("{}", ToolResolver::new(&config).tools_report());
        }
    }

    Ok(())
}
