use thiserror::Error;

/// Configuration rejection. Per-frame processing never fails: degenerate
/// detections are filtered and infeasible assignments become "no match",
/// so invalid settings are the only error surface of the engine.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("output buffer capacity must be greater than zero")]
    ZeroCapacity,
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
    #[error("{name} out of range: {value} (expected {min}..={max})")]
    OutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("size window is inverted: thr_size_min {min} > thr_size_max {max}")]
    InvertedSizeWindow { min: f32, max: f32 },
}
