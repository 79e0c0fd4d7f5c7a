use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use log::{error, info};

use emosense::chart;
use emosense::config::{self, SettingsStore};
use emosense::recording::MediaReview;
use emosense::timeline::{export_file_name, write_csv};
use emosense::AnalysisClient;

/// Analyze a recorded image or video against the emotion analysis service
/// and export the resulting timeline as CSV.
#[derive(Debug, Parser)]
#[command(name = "emosense", version)]
struct Cli {
    /// Media file to analyze (image or video)
    media: PathBuf,

    /// Media duration in seconds, used for progress reporting on video
    #[arg(long)]
    duration: Option<f64>,

    /// Directory the CSV export is written into
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Settings file (created with defaults when missing)
    #[arg(long, default_value = "emosense.settings.json")]
    settings: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if config::debug_mode() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let settings = SettingsStore::new(cli.settings)?;
    let client = AnalysisClient::new(&settings.api());
    let review = MediaReview::with_capacity(client, settings.snapshot().review_capacity);

    info!("analyzing {}", cli.media.display());

    let mut timeline = review.new_timeline();
    let outcome = review
        .analyze_file(&cli.media, cli.duration, &mut timeline, |progress| {
            match progress.percent {
                Some(percent) => {
                    info!("{} readings ({percent:.0}%)", progress.analyzed)
                }
                None => info!("{} readings", progress.analyzed),
            }
        })
        .await;

    // A mid-stream failure still leaves the readings delivered so far;
    // export them before surfacing the error.
    if !timeline.is_empty() {
        let entries = timeline.all();
        let path = cli.out.join(export_file_name(Utc::now()));
        write_csv(&path, &entries)?;
        info!("exported {} readings to {}", entries.len(), path.display());

        for aggregate in chart::aggregate(&entries) {
            info!(
                "{}: {} frames, mean confidence {:.2}",
                aggregate.emotion, aggregate.count, aggregate.mean_confidence
            );
        }
    }

    match outcome {
        Ok(delivered) => {
            info!("analysis complete: {delivered} readings");
            Ok(())
        }
        Err(err) => {
            error!("analysis ended early: {err:#}");
            Err(err)
        }
    }
}
