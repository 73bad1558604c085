use chrono::Utc;
use tracing::debug;

use crate::capture::quality::qualify;
use crate::capture::{CaptureConfig, CaptureEvent, CaptureMode};
use crate::mot::{BestShot, ConfigError, Detection, Track, TrackState};

/// Per-frame capture decisions over the registry's track list.
///
/// The policy reads track state and owns the capture-bookkeeping fields on
/// each track; it never touches the motion filter. Unconfirmed (`Idle`)
/// tracks are invisible to it.
pub struct CapturePolicy {
    config: CaptureConfig,
    sequence: u64,
}

impl CapturePolicy {
    pub fn new(config: CaptureConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(CapturePolicy {
            config,
            sequence: 0,
        })
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Replaces the capture settings. On rejection the previous valid
    /// configuration stays in effect.
    pub fn set_config(&mut self, config: CaptureConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// One pass over the tracks after association. Call before expired
    /// tracks are purged so Auto mode gets its final flush.
    pub fn observe(
        &mut self,
        frame_id: u64,
        frame_width: f32,
        frame_height: f32,
        tracks: &mut [Track],
    ) -> Vec<CaptureEvent> {
        let mut events = Vec::new();
        for track in tracks.iter_mut() {
            if !track.is_reported() {
                continue;
            }
            // score only fresh observations; while coasting the box is a
            // prediction with stale crop data
            let quality = if track.matched_this_frame() {
                qualify(&self.config, track.last_detection(), frame_width, frame_height)
            } else {
                None
            };
            match self.config.mode {
                CaptureMode::Fast => self.observe_fast(frame_id, track, quality, &mut events),
                CaptureMode::Cycle => self.observe_cycle(frame_id, track, quality, &mut events),
                CaptureMode::Auto => self.observe_auto(frame_id, track, quality, &mut events),
            }
        }
        events
    }

    /// First observation past `thr_quality` wins each window; repeats every
    /// `fast_m_interval` frames up to the per-track cap. No best-of
    /// comparison and nothing pending at track exit.
    fn observe_fast(
        &mut self,
        frame_id: u64,
        track: &mut Track,
        quality: Option<f32>,
        events: &mut Vec<CaptureEvent>,
    ) {
        if track.state() != TrackState::Alive {
            return;
        }
        if track.book.captures >= self.config.fast_m_capture_num {
            return;
        }
        if let Some(last) = track.book.last_capture_frame {
            if frame_id - last < self.config.fast_m_interval {
                return;
            }
        }
        if let Some(quality) = quality {
            if quality >= self.config.thr_quality {
                let detection = track.last_detection().clone();
                events.push(self.emit(track, detection, quality, frame_id));
                track.book.captures += 1;
                track.book.last_capture_frame = Some(frame_id);
            }
        }
    }

    /// Best qualifying observation of each fixed-length window, emitted
    /// when the window elapses. A window cut short by the track leaving is
    /// dropped, keeping consecutive captures at least one interval apart.
    fn observe_cycle(
        &mut self,
        frame_id: u64,
        track: &mut Track,
        quality: Option<f32>,
        events: &mut Vec<CaptureEvent>,
    ) {
        if track.state() == TrackState::Miss {
            track.book.best = None;
            track.book.window_start = None;
            return;
        }
        let window_start = *track.book.window_start.get_or_insert(frame_id);
        if let Some(quality) = quality {
            record_best(track, quality, frame_id);
        }
        if frame_id - window_start + 1 >= self.config.cycle_m_interval {
            if let Some(best) = track.book.best.take() {
                events.push(self.emit(track, best.detection, best.quality, best.frame_id));
                track.book.captures += 1;
                track.book.last_capture_frame = Some(frame_id);
            }
            track.book.window_start = Some(frame_id + 1);
        }
    }

    /// One best-shot per track lifetime: emitted early when quality clears
    /// `thr_quality_high`, otherwise at the transition out of `Alive`.
    /// Optionally one provisional capture on the first qualifying frame.
    fn observe_auto(
        &mut self,
        frame_id: u64,
        track: &mut Track,
        quality: Option<f32>,
        events: &mut Vec<CaptureEvent>,
    ) {
        if track.book.auto_emitted {
            return;
        }
        if track.state() == TrackState::Miss {
            if let Some(best) = track.book.best.take() {
                events.push(self.emit(track, best.detection, best.quality, best.frame_id));
                track.book.captures += 1;
                track.book.auto_emitted = true;
            }
            return;
        }
        if let Some(quality) = quality {
            record_best(track, quality, frame_id);
            if self.config.auto_m_fast_cap
                && !track.book.fast_capped
                && quality >= self.config.thr_quality
            {
                let detection = track.last_detection().clone();
                events.push(self.emit(track, detection, quality, frame_id));
                track.book.captures += 1;
                track.book.fast_capped = true;
                // the captured observation must not come back as the final
                // best-shot; later observations re-seed it
                track.book.best = None;
            }
        }
        let ready = track
            .book
            .best
            .as_ref()
            .map_or(false, |b| b.quality > self.config.thr_quality_high);
        if ready {
            if let Some(best) = track.book.best.take() {
                events.push(self.emit(track, best.detection, best.quality, best.frame_id));
                track.book.captures += 1;
                track.book.auto_emitted = true;
            }
        }
    }

    fn emit(
        &mut self,
        track: &Track,
        detection: Detection,
        quality: f32,
        frame_id: u64,
    ) -> CaptureEvent {
        let sequence = self.sequence;
        self.sequence += 1;
        debug!(id = track.id(), quality, frame_id, sequence, "capture emitted");
        CaptureEvent {
            track_id: track.id(),
            detection,
            quality,
            state: track.state(),
            frame_id,
            sequence,
            captured_at: Utc::now(),
        }
    }
}

fn record_best(track: &mut Track, quality: f32, frame_id: u64) {
    let better = track
        .book
        .best
        .as_ref()
        .map_or(true, |b| quality > b.quality);
    if better {
        track.book.best = Some(BestShot {
            detection: track.last_detection().clone(),
            quality,
            frame_id,
        });
    }
}
