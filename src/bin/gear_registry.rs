//! gear_registry - manage workshops and cameras, read stored reports

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use gear_watch::SqliteViolationStore;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the violation database.
    #[arg(long, env = "GEAR_DB_PATH", default_value = "gear_watch.db")]
    db_path: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a workshop by number.
    AddWorkshop {
        #[arg(long)]
        number: i64,
    },
    /// Attach a camera to a registered workshop.
    AddCamera {
        #[arg(long)]
        camera_id: i64,
        #[arg(long)]
        workshop: i64,
    },
    /// Print registered workshops and their cameras as JSON.
    ListWorkshops,
    /// Print stored reports as JSON, newest first.
    ListReports,
    /// Write a report's evidence JPEG to a file.
    ExportPhoto {
        #[arg(long)]
        report_id: i64,
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let mut store = SqliteViolationStore::open(&args.db_path)?;

    match args.command {
        Command::AddWorkshop { number } => {
            let id = store.add_workshop(number)?;
            log::info!("registered workshop {} (id {})", number, id);
        }
        Command::AddCamera {
            camera_id,
            workshop,
        } => {
            store.add_camera(camera_id, workshop)?;
            log::info!("camera {} attached to workshop {}", camera_id, workshop);
        }
        Command::ListWorkshops => {
            let workshops = store.list_workshops()?;
            println!("{}", serde_json::to_string_pretty(&workshops)?);
        }
        Command::ListReports => {
            let reports = store.list_reports()?;
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        Command::ExportPhoto { report_id, output } => {
            let photo = store
                .report_photo(report_id)?
                .ok_or_else(|| anyhow!("report {} not found", report_id))?;
            std::fs::write(&output, &photo)
                .map_err(|e| anyhow!("failed to write {}: {}", output.display(), e))?;
            log::info!(
                "wrote {} bytes for report {} to {}",
                photo.len(),
                report_id,
                output.display()
            );
        }
    }
    Ok(())
}
