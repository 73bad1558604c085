//! Track-and-capture engine: multi object tracking with best-shot
//! capture policies.
//!
//! Per frame, external detections go through the track registry
//! ([`mot::Tracker`], backed by the [`assignment`] solver and the
//! [`filter`] motion model), the resulting track list through the
//! capture policy ([`capture::CapturePolicy`]), and emitted captures
//! into the bounded [`channel::OutputBuffer`]. The
//! [`capture::CaptureEngine`] facade wires all of it behind one
//! `process_frame` call.

pub mod assignment;
pub mod capture;
pub mod channel;
pub mod filter;
pub mod mot;
pub mod utils;
