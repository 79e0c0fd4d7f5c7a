use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use super::{Emotion, Label};

/// When a classification was produced: a wall-clock instant for live
/// capture, or a media offset in seconds for streamed video analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Timestamp {
    Wall(DateTime<Utc>),
    Offset(f64),
}

impl Timestamp {
    /// Current wall-clock instant, rounded to millisecond precision so that
    /// the displayed ISO-8601 form parses back to the same value.
    pub fn now() -> Self {
        let now = Utc::now();
        let millis = DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);
        Timestamp::Wall(millis)
    }

    /// Parse either an ISO-8601 instant or a float seconds offset.
    pub fn parse(value: &str) -> Option<Timestamp> {
        if let Ok(seconds) = value.parse::<f64>() {
            return Some(Timestamp::Offset(seconds));
        }
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| Timestamp::Wall(dt.with_timezone(&Utc)))
    }

    pub fn offset_secs(&self) -> Option<f64> {
        match self {
            Timestamp::Offset(seconds) => Some(*seconds),
            Timestamp::Wall(_) => None,
        }
    }
}

impl Eq for Timestamp {}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Timestamp::Wall(a), Timestamp::Wall(b)) => a.cmp(b),
            (Timestamp::Offset(a), Timestamp::Offset(b)) => a.total_cmp(b),
            // Offsets sort before instants; a session never mixes the two.
            (Timestamp::Offset(_), Timestamp::Wall(_)) => Ordering::Less,
            (Timestamp::Wall(_), Timestamp::Offset(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Wall(instant) => {
                f.write_str(&instant.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Timestamp::Offset(seconds) => write!(f, "{seconds}"),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Timestamp::Wall(_) => serializer.serialize_str(&self.to_string()),
            Timestamp::Offset(seconds) => serializer.serialize_f64(*seconds),
        }
    }
}

/// Axis-aligned rectangle in source-image pixel coordinates. The single
/// canonical form; wire shapes are normalized into this at the boundary.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct EmotionScore {
    pub label: Emotion,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FaceDetection {
    pub bounding_box: BoundingBox,
    pub scores: Vec<EmotionScore>,
}

impl FaceDetection {
    /// Highest-scoring emotion for this face.
    pub fn dominant(&self) -> Option<EmotionScore> {
        self.scores
            .iter()
            .copied()
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

/// One timestamped classification result, the unit stored in the timeline.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmotionReading {
    pub timestamp: Timestamp,
    pub label: Label,
    pub confidence: f32,
    pub faces: Vec<FaceDetection>,
}

impl EmotionReading {
    pub fn new(timestamp: Timestamp, emotion: Emotion, confidence: f32) -> Self {
        Self {
            timestamp,
            label: Label::Emotion(emotion),
            confidence: confidence.clamp(0.0, 1.0),
            faces: Vec::new(),
        }
    }

    /// Sentinel reading for a frame in which no face was found. Carries no
    /// bounding boxes and always zero confidence.
    pub fn no_face(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            label: Label::NoFace,
            confidence: 0.0,
            faces: Vec::new(),
        }
    }

    pub fn bounding_box(&self) -> Option<&BoundingBox> {
        self.faces.first().map(|face| &face.bounding_box)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_round_trips_through_display() {
        let wall = Timestamp::now();
        assert_eq!(Timestamp::parse(&wall.to_string()), Some(wall));

        let offset = Timestamp::Offset(12.5);
        assert_eq!(Timestamp::parse(&offset.to_string()), Some(offset));
    }

    #[test]
    fn offsets_order_numerically() {
        let a = Timestamp::Offset(1.0);
        let b = Timestamp::Offset(2.5);
        assert!(a < b);
    }

    #[test]
    fn confidence_is_clamped_to_unit_interval() {
        let reading = EmotionReading::new(Timestamp::Offset(0.0), Emotion::Happy, 1.7);
        assert_eq!(reading.confidence, 1.0);

        let reading = EmotionReading::new(Timestamp::Offset(0.0), Emotion::Sad, -0.2);
        assert_eq!(reading.confidence, 0.0);
    }

    #[test]
    fn no_face_reading_has_zero_confidence_and_no_boxes() {
        let reading = EmotionReading::no_face(Timestamp::now());
        assert!(reading.label.is_no_face());
        assert_eq!(reading.confidence, 0.0);
        assert!(reading.bounding_box().is_none());
    }

    #[test]
    fn dominant_picks_highest_score() {
        let face = FaceDetection {
            bounding_box: BoundingBox {
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
            },
            scores: vec![
                EmotionScore {
                    label: Emotion::Neutral,
                    score: 0.2,
                },
                EmotionScore {
                    label: Emotion::Happy,
                    score: 0.7,
                },
            ],
        };
        assert_eq!(face.dominant().unwrap().label, Emotion::Happy);
    }
}
