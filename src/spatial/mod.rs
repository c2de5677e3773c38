//! Spatial placement core: surface fusion, gaze selection, gesture
//! adjustment and placement commit.

pub mod commit;
pub mod config;
pub mod gaze_select;
pub mod gesture;
pub mod pose;
pub mod registry;
pub mod session;
pub mod visual;

pub use config::{PlacementConfig, SurfaceClass};
pub use session::{Phase, PlacementSession};
