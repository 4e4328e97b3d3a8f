// Replay a recorded landmark stream through a workout session

use anyhow::{Context, Result};
use clap::Parser;
use gymbuddy_lib::{Config, Database, FrameStatus, Landmark, WorkoutTracker};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Count reps and check form over a recorded set of pose frames
#[derive(Parser, Debug)]
#[command(name = "gymbuddy-replay")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Replay pose landmark frames through the rep counter", long_about = None)]
struct Cli {
    /// JSON file holding an array of frames, each an array of 33 landmarks
    #[arg(value_name = "FRAMES")]
    frames: PathBuf,

    /// Exercise to evaluate (push-ups, squats)
    #[arg(long, short = 'e')]
    exercise: Option<String>,

    /// Form tolerance (strict, moderate/medium, loose)
    #[arg(long, short = 's')]
    strictness: Option<String>,

    /// Rep goal for the set
    #[arg(long, short = 'r')]
    reps: Option<u32>,

    /// Capture rate used to timestamp frames
    #[arg(long, default_value = "30")]
    fps: u32,

    /// SQLite file to store the completed set in
    #[arg(long)]
    db: Option<PathBuf>,

    /// Configuration file; defaults to the per-user settings
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().context("Failed to load configuration")?,
    };

    let contents = std::fs::read_to_string(&cli.frames)
        .with_context(|| format!("Failed to read {}", cli.frames.display()))?;
    let frames: Vec<Vec<Landmark>> =
        serde_json::from_str(&contents).context("Frames file is not a JSON array of frames")?;

    let db = match &cli.db {
        Some(path) => Database::init(path)
            .await
            .context("Failed to initialize database")?,
        None => Database::in_memory()
            .await
            .context("Failed to initialize database")?,
    };
    let tracker = WorkoutTracker::new(&config, Arc::new(db));

    if let Some(exercise) = &cli.exercise {
        tracker.select_exercise(exercise).await?;
    }
    if let Some(strictness) = &cli.strictness {
        tracker.set_strictness(strictness).await?;
    }
    if let Some(reps) = cli.reps {
        tracker.set_target_reps(reps).await?;
    }

    info!(frames = frames.len(), "replaying");
    tracker.start().await;

    let frame_interval_ms = 1000.0 / cli.fps.max(1) as f64;
    for (i, frame) in frames.into_iter().enumerate() {
        let timestamp_ms = (i as f64 * frame_interval_ms).round() as i64;
        let result = tracker.process_frame(frame, timestamp_ms).await?;
        println!("{}", serde_json::to_string(&result)?);

        if result.status == FrameStatus::Completed {
            break;
        }
    }

    match tracker.history().await.last() {
        Some(entry) => {
            info!("set complete: {}", entry);
            println!("{}", serde_json::to_string_pretty(&entry.metrics)?);
        }
        None => info!(reps = tracker.rep_count().await, "goal not reached"),
    }

    tracker.shutdown().await?;
    Ok(())
}
