//! gear_scan - scan a directory of recordings for protective-gear violations
//!
//! Every `CAMERA<id>_<HH:MM:SS>.<DD.MM.YYYY>.<ext>` file in the directory is
//! decoded, sampled, checked for people without helmet or uniform, and each
//! debounced violation is stored with its evidence frame.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use gear_watch::detect::load_backends;
use gear_watch::{FileOpener, Pipeline, ScanConfig, SqliteViolationStore, VideoOutcome};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory of recordings to scan.
    #[arg(long)]
    video_dir: Option<PathBuf>,
    /// Path to the violation database.
    #[arg(long)]
    db_path: Option<String>,
    /// ONNX person detection model.
    #[arg(long)]
    person_model: Option<PathBuf>,
    /// ONNX helmet/uniform classification model.
    #[arg(long)]
    gear_model: Option<PathBuf>,
    /// Evaluate every Nth decoded frame.
    #[arg(long)]
    stride: Option<u64>,
    /// Minimum video time between gear checks, in seconds.
    #[arg(long)]
    debounce_secs: Option<f64>,
    /// JSON or TOML config file (overrides GEAR_CONFIG).
    #[arg(long)]
    config: Option<PathBuf>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = ui::Ui::from_args(Some(&args.ui), std::io::stderr().is_terminal());

    let mut cfg = match &args.config {
        Some(path) => ScanConfig::load_from(Some(path.as_path()))?,
        None => ScanConfig::load()?,
    };
    if let Some(dir) = args.video_dir {
        cfg.video_dir = Some(dir);
    }
    if let Some(db_path) = args.db_path {
        cfg.db_path = db_path;
    }
    if let Some(path) = args.person_model {
        cfg.models.person_model = Some(path);
    }
    if let Some(path) = args.gear_model {
        cfg.models.gear_model = Some(path);
    }
    if let Some(stride) = args.stride {
        cfg.pipeline.stride = stride;
    }
    if let Some(secs) = args.debounce_secs {
        cfg.pipeline.debounce_interval_s = secs;
    }
    cfg.validate()?;

    let video_dir = cfg
        .video_dir
        .clone()
        .ok_or_else(|| anyhow!("--video-dir (or GEAR_VIDEO_DIR) is required"))?;

    let store = {
        let _stage = ui.stage("Open violation store");
        SqliteViolationStore::open(&cfg.db_path)?
    };
    let (detector, classifier) = {
        let _stage = ui.stage("Load models");
        load_backends(&cfg.models)?
    };

    let mut pipeline = Pipeline::new(
        cfg.pipeline.clone(),
        Box::new(FileOpener::new()),
        detector,
        classifier,
        store,
    );

    let total = pipeline.list_videos(&video_dir)?.len() as u64;
    let summary = {
        let _stage = ui.stage("Scan videos");
        let mut progress = ui.videos(total);
        pipeline.run_with(&video_dir, |report| {
            let status = match &report.outcome {
                VideoOutcome::Completed => format!("{} violation(s)", report.violations_saved),
                VideoOutcome::Skipped(_) => "skipped".to_string(),
                VideoOutcome::Truncated(_) => {
                    format!("{} violation(s), truncated", report.violations_saved)
                }
                VideoOutcome::Aborted(_) => "aborted".to_string(),
            };
            progress.finish_video(&report.file_name(), &status);
        })?
    };

    println!(
        "scanned {} video(s), skipped {}, failed {}: {} violation(s) saved, {} discarded",
        summary.videos_scanned(),
        summary.videos_skipped(),
        summary.videos_failed(),
        summary.violations_saved(),
        summary.violations_discarded()
    );
    println!("reports written to {}", cfg.db_path);
    Ok(())
}
