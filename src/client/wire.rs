//! Raw response shapes from the analysis service and their normalization
//! into the canonical model types. The backend is polymorphic in a few
//! places (bounding box form, face list key); everything is normalized
//! here so no downstream code branches on shape.

use serde::Deserialize;

use crate::model::{
    BoundingBox, Emotion, EmotionReading, EmotionScore, FaceDetection, Label, Timestamp,
};

/// Bounding box as the backend sends it: absolute edges or origin+extent.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawBoundingBox {
    Edges {
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
    },
    Extent {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

impl RawBoundingBox {
    fn normalize(self) -> BoundingBox {
        match self {
            RawBoundingBox::Edges {
                left,
                top,
                right,
                bottom,
            } => BoundingBox {
                x: left,
                y: top,
                width: right - left,
                height: bottom - top,
            },
            RawBoundingBox::Extent {
                x,
                y,
                width,
                height,
            } => BoundingBox {
                x,
                y,
                width,
                height,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawScore {
    pub label: String,
    pub score: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawFace {
    #[serde(alias = "boundingBox")]
    pub bounding_box: Option<RawBoundingBox>,
    #[serde(default)]
    pub emotions: Vec<RawScore>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawAnalysis {
    pub timestamp: Option<serde_json::Value>,
    pub emotion: Option<String>,
    pub confidence: Option<f32>,
    #[serde(default, alias = "all_faces")]
    pub faces: Vec<RawFace>,
}

impl RawAnalysis {
    /// Collapse the raw record into one canonical reading. Unknown emotion
    /// strings and missing confidences fall back to the no-face sentinel and
    /// zero respectively; a missing timestamp uses `fallback`.
    pub(crate) fn normalize(self, fallback: Timestamp) -> EmotionReading {
        let timestamp = self
            .timestamp
            .as_ref()
            .and_then(raw_timestamp)
            .unwrap_or(fallback);

        let label = self
            .emotion
            .as_deref()
            .and_then(Label::parse)
            .unwrap_or(Label::NoFace);

        if label.is_no_face() {
            return EmotionReading::no_face(timestamp);
        }

        let confidence = self.confidence.unwrap_or(0.0).clamp(0.0, 1.0);

        let faces = self
            .faces
            .into_iter()
            .filter_map(normalize_face)
            .collect::<Vec<_>>();

        EmotionReading {
            timestamp,
            label,
            confidence,
            faces,
        }
    }
}

fn raw_timestamp(value: &serde_json::Value) -> Option<Timestamp> {
    match value {
        serde_json::Value::Number(number) => number.as_f64().map(Timestamp::Offset),
        serde_json::Value::String(text) => Timestamp::parse(text),
        _ => None,
    }
}

/// Faces without a bounding box carry nothing the overlay can draw; they
/// are dropped during normalization.
fn normalize_face(raw: RawFace) -> Option<FaceDetection> {
    let bounding_box = raw.bounding_box?.normalize();
    let scores = raw
        .emotions
        .into_iter()
        .filter_map(|score| {
            Emotion::parse(&score.label).map(|label| EmotionScore {
                label,
                score: score.score.clamp(0.0, 1.0),
            })
        })
        .collect();

    Some(FaceDetection {
        bounding_box,
        scores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> RawAnalysis {
        serde_json::from_str(body).expect("valid analysis body")
    }

    #[test]
    fn normalizes_edge_form_bounding_box() {
        let raw = parse(
            r#"{"emotion":"happy","confidence":0.9,
                "all_faces":[{"bounding_box":{"left":10,"top":20,"right":110,"bottom":140},
                              "emotions":[{"label":"happy","score":0.9}]}]}"#,
        );
        let reading = raw.normalize(Timestamp::Offset(0.0));
        let bbox = reading.bounding_box().copied().unwrap();
        assert_eq!(
            bbox,
            BoundingBox {
                x: 10.0,
                y: 20.0,
                width: 100.0,
                height: 120.0
            }
        );
    }

    #[test]
    fn normalizes_extent_form_bounding_box() {
        let raw = parse(
            r#"{"emotion":"sad","confidence":0.4,
                "faces":[{"boundingBox":{"x":5,"y":6,"width":50,"height":60},"emotions":[]}]}"#,
        );
        let reading = raw.normalize(Timestamp::Offset(0.0));
        let bbox = reading.bounding_box().copied().unwrap();
        assert_eq!(
            bbox,
            BoundingBox {
                x: 5.0,
                y: 6.0,
                width: 50.0,
                height: 60.0
            }
        );
    }

    #[test]
    fn no_face_sentinel_resets_confidence_and_faces() {
        let raw = parse(
            r#"{"emotion":"no_face","confidence":0.7,
                "faces":[{"boundingBox":{"x":1,"y":1,"width":2,"height":2}}]}"#,
        );
        let reading = raw.normalize(Timestamp::Offset(0.0));
        assert!(reading.label.is_no_face());
        assert_eq!(reading.confidence, 0.0);
        assert!(reading.faces.is_empty());
    }

    #[test]
    fn out_of_range_confidence_is_clamped() {
        let raw = parse(r#"{"emotion":"anger","confidence":1.6}"#);
        assert_eq!(raw.normalize(Timestamp::Offset(0.0)).confidence, 1.0);
    }

    #[test]
    fn missing_confidence_defaults_to_zero() {
        let raw = parse(r#"{"emotion":"fear"}"#);
        assert_eq!(raw.normalize(Timestamp::Offset(0.0)).confidence, 0.0);
    }

    #[test]
    fn unknown_emotion_becomes_no_face() {
        let raw = parse(r#"{"emotion":"bored","confidence":0.8}"#);
        assert!(raw.normalize(Timestamp::Offset(0.0)).label.is_no_face());
    }

    #[test]
    fn numeric_and_textual_timestamps_both_parse() {
        let raw = parse(r#"{"timestamp":3.5,"emotion":"happy","confidence":0.5}"#);
        let reading = raw.normalize(Timestamp::Offset(0.0));
        assert_eq!(reading.timestamp, Timestamp::Offset(3.5));

        let raw = parse(r#"{"timestamp":"7.25","emotion":"happy","confidence":0.5}"#);
        let reading = raw.normalize(Timestamp::Offset(0.0));
        assert_eq!(reading.timestamp, Timestamp::Offset(7.25));
    }

    #[test]
    fn faces_without_bounding_box_are_dropped() {
        let raw = parse(
            r#"{"emotion":"happy","confidence":0.9,"faces":[{"emotions":[{"label":"happy","score":0.9}]}]}"#,
        );
        assert!(raw.normalize(Timestamp::Offset(0.0)).faces.is_empty());
    }
}
