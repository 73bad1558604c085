use chrono::{DateTime, Utc};

use crate::mot::{Detection, TrackState};

/// One emitted capture: the chosen observation plus enough context for a
/// downstream writer or recognizer to act on it without consulting the
/// engine again.
#[derive(Debug, Clone)]
pub struct CaptureEvent {
    pub track_id: u64,
    /// The captured observation, crop and landmarks included.
    pub detection: Detection,
    pub quality: f32,
    /// Track state at emission time. `Miss` marks Auto mode's final flush.
    pub state: TrackState,
    /// Frame the observation was taken on (not necessarily the frame it
    /// was emitted on; Cycle and Auto emit retrospectively).
    pub frame_id: u64,
    /// Global emission order across all tracks, starting at 0.
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
}
