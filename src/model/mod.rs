mod emotion;
mod reading;

pub use emotion::{Emotion, Label, EMOTION_COUNT};
pub use reading::{BoundingBox, EmotionReading, EmotionScore, FaceDetection, Timestamp};
