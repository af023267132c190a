use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

use form_analyzer::{
    AnalysisGateway, AnalyzeOutcome, Config, ExerciseType, FormAnalysisClient, HttpGateway, LocalPreviewRegistry, ProgressSink,
    SelectionOutcome, SelectionSource, VideoFile,
};

#[derive(Parser)]
#[command(name = "form-analyzer")]
#[command(version, about = "Upload a workout video and get a form analysis report")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Analysis backend origin (overrides config)
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a video
    Analyze {
        /// Video file to upload
        video: PathBuf,

        /// Exercise performed in the video
        #[arg(short, long, value_enum, default_value_t = ExerciseType::Squat)]
        exercise: ExerciseType,

        /// Apply drag-and-drop rules: refuse files that are not video/*
        #[arg(long)]
        drop: bool,

        /// Print the raw report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check that the analysis backend is reachable
    Health,
    /// List supported exercises
    Exercises,
}

/// Redraws a single progress line on stderr
struct TerminalProgress;

impl ProgressSink for TerminalProgress {
    fn on_progress(&self, percent: u8) {
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "\rUploading... {:>3}%", percent);
        let _ = stderr.flush();
    }
}

fn log_directives(verbose: bool, level: &str) -> String {
    if verbose {
        "form_analyzer=debug,info".to_string()
    } else {
        format!("form_analyzer={},warn", level)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging is up before the config file is read; the configured level
    // replaces the initial filter afterwards.
    let (filter, filter_handle) = reload::Layer::new(EnvFilter::new(log_directives(
        cli.verbose,
        &std::env::var("FORM_ANALYZER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
    )));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("{}; using defaults", e);
            Config::from_env()?
        }
    };
    if let Some(backend) = cli.backend {
        config.backend.origin = backend;
    }
    filter_handle.reload(EnvFilter::new(log_directives(cli.verbose, &config.output.log_level)))?;

    config.validate()?;
    let origin = config.origin()?;

    match cli.command {
        Commands::Exercises => {
            for exercise in ExerciseType::ALL {
                println!("{:<16} {}", exercise.as_str(), exercise.label());
            }
        }
        Commands::Health => {
            let gateway = HttpGateway::new(origin.clone(), &config.backend)?;
            if gateway.is_available().await {
                println!("Analysis backend at {} is healthy", origin);
            } else {
                return Err(anyhow!("Analysis backend at {} is not reachable", origin));
            }
        }
        Commands::Analyze {
            video,
            exercise,
            drop,
            json,
        } => {
            let gateway = HttpGateway::new(origin.clone(), &config.backend)?;
            let mut client = FormAnalysisClient::new(gateway, LocalPreviewRegistry::new(), origin)
                .with_progress_observer(Arc::new(TerminalProgress));

            let file = VideoFile::from_path(&video).await?;
            let source = if drop {
                SelectionSource::Drop
            } else {
                SelectionSource::Picker
            };

            client.select_exercise_type(exercise);
            if let SelectionOutcome::Rejected(rejection) = client.select_file(file, source) {
                return Err(anyhow!("{}", rejection));
            }

            info!("Analyzing {} as {}", video.display(), exercise.label());
            let outcome = client.analyze().await;
            eprintln!();

            match outcome {
                AnalyzeOutcome::Completed => {
                    if json {
                        if let Some(result) = client.result() {
                            println!("{}", serde_json::to_string_pretty(result)?);
                        }
                    } else if let Some(report) = client.report() {
                        print!("{}", report.render_text());
                    }
                }
                AnalyzeOutcome::Failed => {
                    for notification in client.take_notifications() {
                        error!("Analysis failed: {}", notification.message);
                    }
                    return Err(anyhow!("Analysis failed"));
                }
                AnalyzeOutcome::NoSelection => {
                    warn!("No video selected");
                }
            }
        }
    }

    Ok(())
}
