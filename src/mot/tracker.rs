use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::assignment::{self, CostMatrix};
use crate::mot::{ConfigError, Detection, Track};
use crate::utils::{cosine_distance, iou, Rect};

/// Association settings for the track registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Consecutive unmatched frames a track survives before it is
    /// declared gone.
    pub miss_time_limit: u32,
    /// Minimum IoU between a predicted box and a detection for the pair
    /// to be considered at all.
    pub iou_floor: f32,
    /// Maximum accepted assignment cost; costlier pairs are treated as
    /// unmatched on both sides.
    pub match_gate: f32,
    /// Blend weight of appearance-feature distance when both the track
    /// and the detection carry a feature vector (0 = IoU only).
    pub feature_weight: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            miss_time_limit: 30,
            iou_floor: 0.05,
            match_gate: 0.9,
            feature_weight: 0.3,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.miss_time_limit == 0 {
            return Err(ConfigError::Zero {
                name: "miss_time_limit",
            });
        }
        check_range("iou_floor", self.iou_floor, 0.0, 1.0)?;
        check_range("match_gate", self.match_gate, 0.0, 1.0)?;
        check_range("feature_weight", self.feature_weight, 0.0, 1.0)?;
        Ok(())
    }
}

pub(crate) fn check_range(
    name: &'static str,
    value: f32,
    min: f32,
    max: f32,
) -> Result<(), ConfigError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Track registry: owns the live tracks and runs one optimal assignment
/// between Kalman-predicted track boxes and fresh detections per frame.
///
/// Basic usage:
///
/// ```
/// use bestshot_rs::mot::{Detection, Tracker, TrackerConfig};
/// use bestshot_rs::utils::Rect;
/// let mut tracker = Tracker::new(TrackerConfig::default()).unwrap();
/// tracker.update(vec![Detection::new(Rect::new(10.0, 10.0, 40.0, 80.0), 0.9)]);
/// assert_eq!(tracker.tracks().len(), 1);
/// ```
pub struct Tracker {
    config: TrackerConfig,
    tracks: Vec<Track>,
    next_id: u64,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Tracker {
            config,
            tracks: Vec::new(),
            next_id: 1,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Replaces the association settings. On rejection the previous valid
    /// configuration stays in effect.
    pub fn set_config(&mut self, config: TrackerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// One frame of association. Invalid detections are dropped up front;
    /// an empty detection list is fine and just advances miss counters.
    pub fn update(&mut self, detections: Vec<Detection>) {
        let detections: Vec<Detection> = detections
            .into_iter()
            .filter(|d| {
                if d.is_valid() {
                    true
                } else {
                    warn!(bbox = ?d.bbox, "dropping detection with degenerate data");
                    false
                }
            })
            .collect();

        // 1. advance every filter one frame
        let predicted: Vec<Rect> = self.tracks.iter_mut().map(|t| t.predict()).collect();

        // 2. association cost between predicted boxes and detections
        let costs = CostMatrix::from_fn(self.tracks.len(), detections.len(), |r, c| {
            pair_cost(&self.config, &self.tracks[r], &predicted[r], &detections[c])
        });

        // 3. optimal assignment, gated
        let solved = assignment::solve(&costs);

        let mut slots: Vec<Option<Detection>> = detections.into_iter().map(Some).collect();
        let mut track_matched = vec![false; self.tracks.len()];
        for (r, assigned) in solved.row_to_col.iter().enumerate() {
            if let Some(c) = assigned {
                let cost = costs.at(r, *c);
                if cost.is_finite() && cost <= self.config.match_gate {
                    if let Some(detection) = slots[*c].take() {
                        self.tracks[r].mark_matched(detection);
                        track_matched[r] = true;
                    }
                }
            }
        }

        // 4. lifecycle for unmatched tracks, new tracks for unmatched detections
        let limit = self.config.miss_time_limit;
        for (r, track) in self.tracks.iter_mut().enumerate() {
            if !track_matched[r] {
                track.mark_missed(limit);
                if track.is_expired() {
                    debug!(id = track.id(), "track expired");
                }
            }
        }
        for slot in slots {
            if let Some(detection) = slot {
                let id = self.next_id;
                self.next_id += 1;
                debug!(id, "track created");
                self.tracks.push(Track::new(id, detection));
            }
        }
    }

    /// Live tracks, ordered by ascending id. Creation order guarantees the
    /// ordering without a sort.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub(crate) fn tracks_mut(&mut self) -> &mut [Track] {
        &mut self.tracks
    }

    /// Removes tracks whose miss counter exceeded the limit. Call after
    /// the capture policy had its final-flush pass over them.
    pub fn purge_expired(&mut self) {
        self.tracks.retain(|t| !t.is_expired());
    }

    pub fn alive_count(&self) -> usize {
        self.tracks
            .iter()
            .filter(|t| t.state() == crate::mot::TrackState::Alive)
            .count()
    }

    /// Drops every track. Ids keep counting up; they are never reused
    /// within a session.
    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}

fn pair_cost(
    config: &TrackerConfig,
    track: &Track,
    predicted: &Rect,
    detection: &Detection,
) -> f32 {
    let overlap = iou(predicted, &detection.bbox);
    if overlap < config.iou_floor {
        return f32::INFINITY;
    }
    let iou_cost = 1.0 - overlap;
    match (
        track.last_detection().feature.as_deref(),
        detection.feature.as_deref(),
    ) {
        (Some(a), Some(b)) if config.feature_weight > 0.0 => {
            let w = config.feature_weight;
            (1.0 - w) * iou_cost + w * cosine_distance(a, b)
        }
        _ => iou_cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mot::TrackState;

    fn det(x: f32, y: f32) -> Detection {
        Detection::new(Rect::new(x, y, 40.0, 80.0), 0.9)
    }

    fn tracker(limit: u32) -> Tracker {
        Tracker::new(TrackerConfig {
            miss_time_limit: limit,
            ..TrackerConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TrackerConfig {
            match_gate: 1.5,
            ..TrackerConfig::default()
        };
        assert!(Tracker::new(config).is_err());

        let mut tracker = tracker(5);
        let bad = TrackerConfig {
            miss_time_limit: 0,
            ..TrackerConfig::default()
        };
        assert!(tracker.set_config(bad).is_err());
        // previous configuration still in effect
        assert_eq!(tracker.config().miss_time_limit, 5);
    }

    #[test]
    fn test_track_created_per_new_identity() {
        let mut tracker = tracker(5);
        tracker.update(vec![det(0.0, 0.0), det(500.0, 500.0)]);
        assert_eq!(tracker.tracks().len(), 2);
        assert_eq!(tracker.tracks()[0].id(), 1);
        assert_eq!(tracker.tracks()[1].id(), 2);
        assert!(tracker
            .tracks()
            .iter()
            .all(|t| t.state() == TrackState::Idle));
    }

    #[test]
    fn test_second_match_confirms() {
        let mut tracker = tracker(5);
        tracker.update(vec![det(0.0, 0.0)]);
        tracker.update(vec![det(2.0, 0.0)]);
        assert_eq!(tracker.tracks().len(), 1);
        assert_eq!(tracker.tracks()[0].state(), TrackState::Alive);
        assert_eq!(tracker.alive_count(), 1);
    }

    #[test]
    fn test_ids_unique_and_never_reused() {
        let mut tracker = tracker(1);
        tracker.update(vec![det(0.0, 0.0)]);
        // miss out the track completely
        for _ in 0..3 {
            tracker.update(vec![]);
            tracker.purge_expired();
        }
        assert!(tracker.tracks().is_empty());
        // a new identity at the same spot gets a fresh id
        tracker.update(vec![det(0.0, 0.0)]);
        assert_eq!(tracker.tracks()[0].id(), 2);
    }

    #[test]
    fn test_empty_frame_advances_miss_counters() {
        let mut tracker = tracker(5);
        tracker.update(vec![det(0.0, 0.0)]);
        tracker.update(vec![det(1.0, 0.0)]);
        tracker.update(vec![]);
        assert_eq!(tracker.tracks()[0].miss_counter(), 1);
        tracker.update(vec![]);
        assert_eq!(tracker.tracks()[0].miss_counter(), 2);
    }

    #[test]
    fn test_degenerate_detections_are_dropped() {
        let mut tracker = tracker(5);
        tracker.update(vec![
            Detection::new(Rect::new(f32::NAN, 0.0, 10.0, 10.0), 0.9),
            Detection::new(Rect::new(0.0, 0.0, -5.0, 10.0), 0.9),
        ]);
        assert!(tracker.tracks().is_empty());
    }

    #[test]
    fn test_miss_transition_needs_exactly_limit_frames() {
        let limit = 4;
        let mut tracker = tracker(limit);
        tracker.update(vec![det(0.0, 0.0)]);
        tracker.update(vec![det(1.0, 0.0)]);
        for _ in 0..limit {
            tracker.update(vec![]);
            assert_eq!(tracker.tracks()[0].state(), TrackState::Alive);
            tracker.purge_expired();
        }
        tracker.update(vec![]);
        assert_eq!(tracker.tracks()[0].state(), TrackState::Miss);
        tracker.purge_expired();
        assert!(tracker.tracks().is_empty());
    }

    #[test]
    fn test_recovery_within_limit() {
        let mut tracker = tracker(5);
        tracker.update(vec![det(0.0, 0.0)]);
        tracker.update(vec![det(1.0, 0.0)]);
        tracker.update(vec![]);
        tracker.update(vec![]);
        tracker.update(vec![det(2.0, 0.0)]);
        assert_eq!(tracker.tracks().len(), 1);
        assert_eq!(tracker.tracks()[0].miss_counter(), 0);
        assert_eq!(tracker.tracks()[0].state(), TrackState::Alive);
    }

    #[test]
    fn test_crossing_paths_keep_ids() {
        // Two boxes approach each other horizontally and swap positions.
        // Kalman-predicted boxes stay closer to their own continuation
        // than to the other track's, so ids must not swap.
        let mut tracker = Tracker::new(TrackerConfig {
            miss_time_limit: 5,
            iou_floor: 0.0,
            match_gate: 1.0,
            feature_weight: 0.0,
        })
        .unwrap();

        // warm the filters up with a clear constant-velocity history
        for frame in 0..10 {
            let left_x = 10.0 * frame as f32; // moving right
            let right_x = 400.0 - 10.0 * frame as f32; // moving left
            tracker.update(vec![det(left_x, 0.0), det(right_x, 0.0)]);
        }
        let id_moving_right = tracker.tracks()[0].id();
        let id_moving_left = tracker.tracks()[1].id();

        // continue through the crossing point and beyond
        for frame in 10..30 {
            let left_x = 10.0 * frame as f32;
            let right_x = 400.0 - 10.0 * frame as f32;
            tracker.update(vec![det(left_x, 0.0), det(right_x, 0.0)]);
        }

        assert_eq!(tracker.tracks().len(), 2);
        let rightward = tracker
            .tracks()
            .iter()
            .find(|t| t.id() == id_moving_right)
            .unwrap();
        let leftward = tracker
            .tracks()
            .iter()
            .find(|t| t.id() == id_moving_left)
            .unwrap();
        // at frame 29 the rightward mover is near x=290, the leftward near x=110
        assert!(rightward.bbox().x > leftward.bbox().x);
    }

    #[test]
    fn test_feature_blend_separates_overlapping_detections() {
        let mut tracker = Tracker::new(TrackerConfig {
            miss_time_limit: 5,
            iou_floor: 0.0,
            match_gate: 1.0,
            feature_weight: 0.9,
        })
        .unwrap();

        let feat_a = vec![1.0, 0.0];
        let feat_b = vec![0.0, 1.0];
        tracker.update(vec![
            det(0.0, 0.0).with_feature(feat_a.clone()),
            det(30.0, 0.0).with_feature(feat_b.clone()),
        ]);
        let id_a = tracker.tracks()[0].id();

        // both detections now overlap both tracks; appearance decides
        tracker.update(vec![
            det(28.0, 0.0).with_feature(feat_b.clone()),
            det(2.0, 0.0).with_feature(feat_a.clone()),
        ]);
        let track_a = tracker.tracks().iter().find(|t| t.id() == id_a).unwrap();
        assert_eq!(track_a.last_detection().feature.as_deref(), Some(&feat_a[..]));
    }
}
