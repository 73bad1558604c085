use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capture::quality::qualify;
use crate::capture::{CaptureConfig, CaptureEvent, CaptureMode, CapturePolicy};
use crate::channel::{OutputBuffer, OverflowPolicy};
use crate::mot::{ConfigError, Detection, Tracker, TrackerConfig, TrackState};
use crate::utils::Rect;

/// One frame of external detector output plus the frame geometry the
/// quality gates need.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: f32,
    pub height: f32,
    pub detections: Vec<Detection>,
}

impl Frame {
    pub fn new(width: f32, height: f32, detections: Vec<Detection>) -> Self {
        Frame {
            width,
            height,
            detections,
        }
    }
}

/// Caller-facing snapshot of one track after a frame was processed.
#[derive(Debug, Clone)]
pub struct TrackView {
    pub id: u64,
    pub state: TrackState,
    pub bbox: Rect,
    pub miss_counter: u32,
    /// Quality score of this frame's observation; `None` while coasting
    /// or when the observation failed a hard gate.
    pub quality: Option<f32>,
}

/// Everything the engine needs at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub tracker: TrackerConfig,
    pub capture: CaptureConfig,
    pub output_capacity: usize,
    pub overflow: OverflowPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            tracker: TrackerConfig::default(),
            capture: CaptureConfig::default(),
            output_capacity: 64,
            overflow: OverflowPolicy::DropOldest,
        }
    }
}

/// Track-and-capture engine: ties the track registry, the capture policy
/// and the output channel together behind one per-frame call.
///
/// Basic usage:
///
/// ```
/// use bestshot_rs::capture::{CaptureEngine, EngineConfig, Frame};
/// use bestshot_rs::mot::Detection;
/// use bestshot_rs::utils::Rect;
/// let mut engine = CaptureEngine::new(EngineConfig::default()).unwrap();
/// let frame = Frame::new(1920.0, 1080.0, vec![
///     Detection::new(Rect::new(100.0, 100.0, 200.0, 300.0), 0.9),
/// ]);
/// let views = engine.process_frame(frame);
/// assert!(views.is_empty()); // unconfirmed tracks are not reported
/// ```
pub struct CaptureEngine {
    tracker: Tracker,
    policy: CapturePolicy,
    output: OutputBuffer<CaptureEvent>,
    frame_id: u64,
}

impl CaptureEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let tracker = Tracker::new(config.tracker)?;
        let policy = CapturePolicy::new(config.capture)?;
        let output = OutputBuffer::with_capacity(config.output_capacity, config.overflow)?;
        Ok(CaptureEngine {
            tracker,
            policy,
            output,
            frame_id: 0,
        })
    }

    /// Runs one frame through association, capture policy and the output
    /// channel. Returns snapshots of every confirmed track, expired ones
    /// included one last time (with `state == Miss`) before deletion.
    pub fn process_frame(&mut self, frame: Frame) -> Vec<TrackView> {
        let frame_id = self.frame_id;
        self.frame_id += 1;

        self.tracker.update(frame.detections);
        let events = self.policy.observe(
            frame_id,
            frame.width,
            frame.height,
            self.tracker.tracks_mut(),
        );
        for event in events {
            self.output.push(event);
        }

        let views: Vec<TrackView> = self
            .tracker
            .tracks()
            .iter()
            .filter(|t| t.is_reported())
            .map(|t| TrackView {
                id: t.id(),
                state: t.state(),
                bbox: t.bbox(),
                miss_counter: t.miss_counter(),
                quality: if t.matched_this_frame() {
                    qualify(
                        self.policy.config(),
                        t.last_detection(),
                        frame.width,
                        frame.height,
                    )
                } else {
                    None
                },
            })
            .collect();

        self.tracker.purge_expired();
        views
    }

    /// Handle to the capture output; clone it into consumer threads.
    pub fn output(&self) -> OutputBuffer<CaptureEvent> {
        self.output.clone()
    }

    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn alive_count(&self) -> usize {
        self.tracker.alive_count()
    }

    pub fn set_tracker_config(&mut self, config: TrackerConfig) -> Result<(), ConfigError> {
        self.tracker.set_config(config)
    }

    pub fn set_capture_config(&mut self, config: CaptureConfig) -> Result<(), ConfigError> {
        self.policy.set_config(config)
    }

    /// Switches the capture mode, keeping every threshold as-is.
    pub fn set_mode(&mut self, mode: CaptureMode) -> Result<(), ConfigError> {
        let config = CaptureConfig {
            mode,
            ..self.policy.config().clone()
        };
        self.policy.set_config(config)
    }

    /// Drops all tracks and pending capture state. The frame counter
    /// restarts; track ids and capture sequence numbers keep counting up
    /// so neither ever repeats within a session, even with events still
    /// undrained in the output buffer.
    pub fn reset(&mut self) {
        debug!("engine reset");
        self.tracker.clear();
        self.frame_id = 0;
    }

    /// Signals consumer drain loops to finish.
    pub fn stop(&self) {
        self.output.stop();
    }
}
