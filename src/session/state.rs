use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Emotion, Label};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Idle,
    LoadingDevice,
    Streaming,
    Paused,
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Idle
    }
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub status: SessionStatus,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    /// Most recent per-tick failure; cleared by the next successful result.
    pub last_error: Option<String>,
}

impl SessionState {
    pub fn begin_loading(&mut self) {
        *self = Self {
            status: SessionStatus::LoadingDevice,
            ..Self::default()
        };
    }

    pub fn begin_streaming(&mut self, session_id: String, started_at: DateTime<Utc>) {
        self.status = SessionStatus::Streaming;
        self.session_id = Some(session_id);
        self.started_at = Some(started_at);
        self.last_error = None;
    }

    pub fn fail_loading(&mut self, message: String) {
        self.status = SessionStatus::Idle;
        self.session_id = None;
        self.started_at = None;
        self.last_error = Some(message);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Last-write-wins "current emotion" readout for the live view. Results are
/// applied in completion order; a stale completion (older tick sequence
/// number than the newest applied) is discarded here, while the timeline
/// still records every completion.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CurrentDisplay {
    pub label: Option<Label>,
    pub confidence: f32,
    #[serde(skip)]
    applied_seq: u64,
}

impl CurrentDisplay {
    /// Apply the completion of sampling tick `seq`. Returns false if a newer
    /// tick already updated the display.
    pub fn apply(&mut self, seq: u64, label: Label, confidence: f32) -> bool {
        if seq < self.applied_seq {
            return false;
        }
        self.applied_seq = seq;
        if label.is_no_face() {
            // Reset rather than retain stale values.
            self.label = Some(Label::Emotion(Emotion::Neutral));
            self.confidence = 0.0;
        } else {
            self.label = Some(label);
            self.confidence = confidence;
        }
        true
    }

    /// Clear the readout after a failed tick; the session keeps running.
    pub fn clear(&mut self, seq: u64) {
        if seq < self.applied_seq {
            return;
        }
        self.applied_seq = seq;
        self.label = None;
        self.confidence = 0.0;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_face_resets_display_to_neutral_zero() {
        let mut display = CurrentDisplay::default();
        display.apply(1, Label::Emotion(Emotion::Happy), 0.9);
        display.apply(2, Label::NoFace, 0.0);
        assert_eq!(display.label, Some(Label::Emotion(Emotion::Neutral)));
        assert_eq!(display.confidence, 0.0);
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut display = CurrentDisplay::default();
        assert!(display.apply(3, Label::Emotion(Emotion::Sad), 0.6));
        assert!(!display.apply(2, Label::Emotion(Emotion::Happy), 0.9));
        assert_eq!(display.label, Some(Label::Emotion(Emotion::Sad)));
    }

    #[test]
    fn failed_tick_clears_the_readout() {
        let mut display = CurrentDisplay::default();
        display.apply(1, Label::Emotion(Emotion::Happy), 0.9);
        display.clear(2);
        assert_eq!(display.label, None);
        assert_eq!(display.confidence, 0.0);
    }

    #[test]
    fn loading_failure_returns_to_idle_with_error() {
        let mut state = SessionState::default();
        state.begin_loading();
        assert_eq!(state.status, SessionStatus::LoadingDevice);
        state.fail_loading("camera permission denied".into());
        assert_eq!(state.status, SessionStatus::Idle);
        assert!(state.last_error.as_deref().unwrap().len() > 0);
        assert!(state.session_id.is_none());
    }
}
