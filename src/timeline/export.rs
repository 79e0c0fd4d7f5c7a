use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::model::EmotionReading;

const CSV_HEADER: &str = "Timestamp,Emotion,Confidence";

/// Render timeline entries as CSV: header plus one row per entry.
pub fn to_csv(entries: &[EmotionReading]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for entry in entries {
        out.push_str(&format!(
            "{},{},{}\n",
            entry.timestamp, entry.label, entry.confidence
        ));
    }
    out
}

/// Artifact name for an export taken at `now`.
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!(
        "emotion_analysis_data_{}.csv",
        now.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

pub fn write_csv(path: &Path, entries: &[EmotionReading]) -> Result<()> {
    std::fs::write(path, to_csv(entries))
        .with_context(|| format!("Failed to write csv export to {}", path.display()))
}
