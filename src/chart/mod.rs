//! Chart-ready projections of the timeline: per-emotion confidence series
//! aligned to the distinct recent timestamps, and aggregate distribution
//! stats for the top-emotions display. Pure functions over a timeline
//! snapshot; calling them twice on the same snapshot yields identical
//! output.

use serde::Serialize;

use crate::model::{Emotion, EmotionReading, Timestamp};

pub const DEFAULT_MAX_POINTS: usize = 30;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmotionSeries {
    pub emotion: Emotion,
    /// One slot per chart label: the rounded percentage confidence where
    /// this emotion was the classification at that exact timestamp, else a
    /// gap. No interpolation.
    pub points: Vec<Option<u32>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChartProjection {
    pub labels: Vec<String>,
    pub series: Vec<EmotionSeries>,
}

/// Project timeline entries onto the most recent `max_points` distinct
/// timestamps. An empty timeline yields empty labels and eight empty
/// series.
pub fn project(entries: &[EmotionReading], max_points: usize) -> ChartProjection {
    let mut timestamps: Vec<Timestamp> = entries.iter().map(|entry| entry.timestamp).collect();
    timestamps.sort();
    timestamps.dedup();
    if timestamps.len() > max_points {
        timestamps.drain(..timestamps.len() - max_points);
    }

    let series = Emotion::ALL
        .iter()
        .map(|&emotion| EmotionSeries {
            emotion,
            points: timestamps
                .iter()
                .map(|&timestamp| {
                    entries
                        .iter()
                        .find(|entry| {
                            entry.timestamp == timestamp
                                && entry.label.emotion() == Some(emotion)
                        })
                        .map(|entry| (entry.confidence * 100.0).round() as u32)
                })
                .collect(),
        })
        .collect();

    ChartProjection {
        labels: timestamps.iter().map(Timestamp::to_string).collect(),
        series,
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmotionAggregate {
    pub emotion: Emotion,
    pub count: usize,
    pub mean_confidence: f32,
}

/// Per-emotion count and mean confidence over the snapshot, sorted
/// descending by count. No-face entries carry no emotion and are excluded.
pub fn aggregate(entries: &[EmotionReading]) -> Vec<EmotionAggregate> {
    let mut aggregates: Vec<EmotionAggregate> = Emotion::ALL
        .iter()
        .filter_map(|&emotion| {
            let matched: Vec<&EmotionReading> = entries
                .iter()
                .filter(|entry| entry.label.emotion() == Some(emotion))
                .collect();
            if matched.is_empty() {
                return None;
            }
            let total: f32 = matched.iter().map(|entry| entry.confidence).sum();
            Some(EmotionAggregate {
                emotion,
                count: matched.len(),
                mean_confidence: total / matched.len() as f32,
            })
        })
        .collect();

    aggregates.sort_by(|a, b| b.count.cmp(&a.count));
    aggregates
}
