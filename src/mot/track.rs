use crate::filter::BoxKalman;
use crate::mot::Detection;
use crate::utils::Rect;

/// Lifecycle state of one tracked identity.
///
/// `Idle`: created, not yet confirmed by a second match; invisible to the
/// capture policy. `Alive`: confirmed and recently matched (a track stays
/// `Alive` through short gaps while `miss_counter` runs). `Miss`: the
/// subject left, meaning the miss counter exceeded the limit; the policy
/// gets one final flush and the registry purges the track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Idle,
    Alive,
    Miss,
}

/// Highest-quality observation collected since the last capture emission.
#[derive(Debug, Clone)]
pub struct BestShot {
    pub detection: Detection,
    pub quality: f32,
    pub frame_id: u64,
}

/// Capture bookkeeping. The policy engine owns these fields; the registry
/// never touches them (and the policy never touches the filter).
#[derive(Debug, Clone, Default)]
pub struct CaptureBook {
    pub best: Option<BestShot>,
    pub captures: u32,
    pub last_capture_frame: Option<u64>,
    /// First frame of the current Cycle window.
    pub window_start: Option<u64>,
    /// Auto mode already emitted its one capture.
    pub auto_emitted: bool,
    /// Auto mode's provisional fast capture already emitted.
    pub fast_capped: bool,
}

/// One persistent identity inferred across frames.
#[derive(Debug, Clone)]
pub struct Track {
    id: u64,
    state: TrackState,
    miss_counter: u32,
    hits: u32,
    filter: BoxKalman,
    last_detection: Detection,
    fresh: bool,
    pub(crate) book: CaptureBook,
}

impl Track {
    pub(crate) fn new(id: u64, detection: Detection) -> Self {
        let filter = BoxKalman::new(&detection.bbox);
        Track {
            id,
            state: TrackState::Idle,
            miss_counter: 0,
            hits: 0,
            filter,
            last_detection: detection,
            fresh: false,
            book: CaptureBook::default(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
    pub fn state(&self) -> TrackState {
        self.state
    }
    pub fn miss_counter(&self) -> u32 {
        self.miss_counter
    }
    pub fn hits(&self) -> u32 {
        self.hits
    }
    /// Most recent matched detection; while missing, its box is replaced
    /// with the filter's prediction.
    pub fn last_detection(&self) -> &Detection {
        &self.last_detection
    }
    pub fn bbox(&self) -> Rect {
        self.last_detection.bbox.clone()
    }
    /// A track enters the capture policy's view only after it has matched
    /// at least once beyond creation.
    pub fn is_reported(&self) -> bool {
        self.hits >= 1
    }
    /// Matched a detection on the current frame.
    pub fn matched_this_frame(&self) -> bool {
        self.fresh
    }
    pub(crate) fn is_expired(&self) -> bool {
        self.state == TrackState::Miss
    }

    /// Motion filter prediction for the coming frame. Clears the
    /// fresh-match flag; one call per track per frame.
    pub(crate) fn predict(&mut self) -> Rect {
        self.fresh = false;
        self.filter.predict()
    }

    pub(crate) fn mark_matched(&mut self, detection: Detection) {
        self.filter.update(&detection.bbox);
        self.last_detection = detection;
        self.miss_counter = 0;
        self.hits += 1;
        self.fresh = true;
        if self.state == TrackState::Idle {
            self.state = TrackState::Alive;
        }
    }

    pub(crate) fn mark_missed(&mut self, miss_time_limit: u32) {
        self.miss_counter += 1;
        // keep drawing the predicted box while the subject is out of sight
        self.last_detection.bbox = self.filter.bbox();
        if self.miss_counter > miss_time_limit {
            self.state = TrackState::Miss;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f32) -> Detection {
        Detection::new(Rect::new(x, 0.0, 20.0, 40.0), 0.9)
    }

    #[test]
    fn test_new_track_is_idle_and_unreported() {
        let track = Track::new(1, det(0.0));
        assert_eq!(track.state(), TrackState::Idle);
        assert!(!track.is_reported());
    }

    #[test]
    fn test_first_match_confirms() {
        let mut track = Track::new(1, det(0.0));
        track.predict();
        track.mark_matched(det(1.0));
        assert_eq!(track.state(), TrackState::Alive);
        assert!(track.is_reported());
        assert!(track.matched_this_frame());
    }

    #[test]
    fn test_miss_is_reached_only_after_limit() {
        let limit = 3;
        let mut track = Track::new(1, det(0.0));
        track.predict();
        track.mark_matched(det(1.0));
        for _ in 0..limit {
            track.predict();
            track.mark_missed(limit);
            assert_eq!(track.state(), TrackState::Alive);
        }
        track.predict();
        track.mark_missed(limit);
        assert_eq!(track.state(), TrackState::Miss);
        assert!(track.is_expired());
    }

    #[test]
    fn test_match_resets_miss_counter() {
        let mut track = Track::new(1, det(0.0));
        track.predict();
        track.mark_matched(det(1.0));
        track.predict();
        track.mark_missed(5);
        track.predict();
        track.mark_missed(5);
        assert_eq!(track.miss_counter(), 2);
        track.predict();
        track.mark_matched(det(2.0));
        assert_eq!(track.miss_counter(), 0);
        assert_eq!(track.state(), TrackState::Alive);
    }
}
