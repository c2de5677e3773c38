//! Surface placement core for head-mounted AR: fuses noisy plane
//! detections into candidate surfaces, selects one by head gaze, lets the
//! user rotate and nudge it, and places an object on it.
//!
//! This library crate exposes the core and its drivers for integration
//! testing. The binary entry point lives in `main.rs`.

pub mod backend;
pub mod capability;
pub mod clock;
pub mod input_source;
pub mod spatial;
