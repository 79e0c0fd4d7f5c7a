use std::fmt;

use serde::{Deserialize, Serialize};

pub const EMOTION_COUNT: usize = 8;

/// Closed set of emotion categories the backend classifier can return.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Happy,
    Sad,
    Surprise,
    Fear,
    Disgust,
    Anger,
    Contempt,
}

impl Emotion {
    pub const ALL: [Emotion; EMOTION_COUNT] = [
        Emotion::Neutral,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
        Emotion::Fear,
        Emotion::Disgust,
        Emotion::Anger,
        Emotion::Contempt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
            Emotion::Fear => "fear",
            Emotion::Disgust => "disgust",
            Emotion::Anger => "anger",
            Emotion::Contempt => "contempt",
        }
    }

    pub fn parse(value: &str) -> Option<Emotion> {
        match value {
            "neutral" => Some(Emotion::Neutral),
            "happy" => Some(Emotion::Happy),
            "sad" => Some(Emotion::Sad),
            "surprise" => Some(Emotion::Surprise),
            "fear" => Some(Emotion::Fear),
            "disgust" => Some(Emotion::Disgust),
            "anger" => Some(Emotion::Anger),
            "contempt" => Some(Emotion::Contempt),
            _ => None,
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying one frame: either a recognized emotion or the
/// `no_face` sentinel meaning no face was found in the sampled frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Emotion(Emotion),
    NoFace,
}

impl Label {
    pub const NO_FACE_STR: &'static str = "no_face";

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Emotion(emotion) => emotion.as_str(),
            Label::NoFace => Self::NO_FACE_STR,
        }
    }

    pub fn parse(value: &str) -> Option<Label> {
        if value == Self::NO_FACE_STR {
            return Some(Label::NoFace);
        }
        Emotion::parse(value).map(Label::Emotion)
    }

    pub fn is_no_face(&self) -> bool {
        matches!(self, Label::NoFace)
    }

    pub fn emotion(&self) -> Option<Emotion> {
        match self {
            Label::Emotion(emotion) => Some(*emotion),
            Label::NoFace => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Label {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
