use serde::{Deserialize, Serialize};

use crate::mot::{check_range, ConfigError};

/// Capture scheduling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureMode {
    /// One best-shot per track lifetime, emitted early on very high
    /// quality or at the latest when the subject leaves.
    Auto,
    /// First observation past the quality threshold, then again every
    /// interval, up to a per-track cap.
    Fast,
    /// Best observation of every fixed-length window.
    Cycle,
}

/// Quality scoring method; all scores land in `[0, 1]`, higher is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityMethod {
    /// Bounding-box area relative to the frame, normalized over the
    /// configured size window.
    AreaRatio,
    /// Inter-eye landmark distance as a proxy for resolvable detail.
    EyesDistance,
    /// Laplacian-variance focus measure on the grayscale crop.
    Laplacian,
}

/// Threshold and interval settings for the capture policy engine.
///
/// Basic usage:
///
/// ```
/// use bestshot_rs::capture::{CaptureConfig, CaptureMode};
/// let config = CaptureConfig {
///     mode: CaptureMode::Fast,
///     thr_quality: 0.5,
///     ..CaptureConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub mode: CaptureMode,
    pub method: QualityMethod,
    /// Box-to-frame area ratio window; outside it an observation is
    /// disqualified outright.
    pub thr_size_min: f32,
    pub thr_size_max: f32,
    /// Baseline quality an observation needs before Fast mode (or Auto's
    /// provisional capture) will emit it.
    pub thr_quality: f32,
    /// Early-exit quality for Auto mode: past this the best-shot is good
    /// enough to emit without waiting for the subject to leave.
    pub thr_quality_high: f32,
    /// Absolute pose angle limits, degrees. Checked only when the
    /// detection carries pose data.
    pub thr_yaw: f32,
    pub thr_pitch: f32,
    pub thr_roll: f32,
    /// Minimum inter-eye distance in pixels for the eyes-distance method.
    pub thr_eye_distance: f32,
    /// Minimum Laplacian variance for the sharpness method.
    pub thr_laplacian: f32,
    /// Frames between repeat captures of one track in Fast mode.
    pub fast_m_interval: u64,
    /// Lifetime capture cap per track in Fast mode.
    pub fast_m_capture_num: u32,
    /// Window length in frames for Cycle mode.
    pub cycle_m_interval: u64,
    /// Auto mode: also emit one provisional capture on the first
    /// qualifying frame, ahead of the final best-shot.
    pub auto_m_fast_cap: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            mode: CaptureMode::Auto,
            method: QualityMethod::AreaRatio,
            thr_size_min: 0.0,
            thr_size_max: 1.0,
            thr_quality: 0.1,
            thr_quality_high: 0.95,
            thr_yaw: 30.0,
            thr_pitch: 30.0,
            thr_roll: 30.0,
            thr_eye_distance: 20.0,
            thr_laplacian: 50.0,
            fast_m_interval: 10,
            fast_m_capture_num: 3,
            cycle_m_interval: 20,
            auto_m_fast_cap: false,
        }
    }
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("thr_size_min", self.thr_size_min, 0.0, 1.0)?;
        check_range("thr_size_max", self.thr_size_max, 0.0, 1.0)?;
        if self.thr_size_min > self.thr_size_max {
            return Err(ConfigError::InvertedSizeWindow {
                min: self.thr_size_min,
                max: self.thr_size_max,
            });
        }
        check_range("thr_quality", self.thr_quality, 0.0, 1.0)?;
        check_range("thr_quality_high", self.thr_quality_high, 0.0, 1.0)?;
        check_range("thr_yaw", self.thr_yaw, 0.0, 180.0)?;
        check_range("thr_pitch", self.thr_pitch, 0.0, 180.0)?;
        check_range("thr_roll", self.thr_roll, 0.0, 180.0)?;
        if !self.thr_eye_distance.is_finite() || self.thr_eye_distance < 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "thr_eye_distance",
                value: self.thr_eye_distance,
                min: 0.0,
                max: f32::MAX,
            });
        }
        if !self.thr_laplacian.is_finite() || self.thr_laplacian < 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "thr_laplacian",
                value: self.thr_laplacian,
                min: 0.0,
                max: f32::MAX,
            });
        }
        if self.fast_m_interval == 0 {
            return Err(ConfigError::Zero {
                name: "fast_m_interval",
            });
        }
        if self.fast_m_capture_num == 0 {
            return Err(ConfigError::Zero {
                name: "fast_m_capture_num",
            });
        }
        if self.cycle_m_interval == 0 {
            return Err(ConfigError::Zero {
                name: "cycle_m_interval",
            });
        }
        Ok(())
    }
}
