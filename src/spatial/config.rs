//! Placement tuning: every threshold and behavior switch in one place.

use std::time::Duration;

/// Semantic class reported by the surface detector for a plane anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceClass {
    Table,
    Floor,
    Ceiling,
    Seat,
    Wall,
    Door,
    Window,
    Unknown,
}

impl SurfaceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Floor => "floor",
            Self::Ceiling => "ceiling",
            Self::Seat => "seat",
            Self::Wall => "wall",
            Self::Door => "door",
            Self::Window => "window",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "table" => Some(Self::Table),
            "floor" => Some(Self::Floor),
            "ceiling" => Some(Self::Ceiling),
            "seat" => Some(Self::Seat),
            "wall" => Some(Self::Wall),
            "door" => Some(Self::Door),
            "window" => Some(Self::Window),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// Configuration for one placement session.
#[derive(Debug, Clone)]
pub struct PlacementConfig {
    /// Only anchors of this class become candidates.
    pub target_class: SurfaceClass,
    /// Horizontal distance below which two detections are the same surface.
    pub merge_threshold: f32,
    /// Collapse near-duplicate detections into one item.
    pub merge_on_detect: bool,
    /// Minimum view-alignment (cosine) for a surface to become active.
    /// 0.95 is roughly 18 degrees off the gaze direction.
    pub gaze_threshold: f32,
    /// Cadence of the gaze poll.
    pub gaze_interval: Duration,
    /// Hide candidates that are not under gaze.
    pub hide_unfocused: bool,
    /// Per-tick bound on each axis of a nudge.
    pub nudge_clamp: f32,
    /// Quantization step for nudges.
    pub nudge_step: f32,
    /// Width and depth of a candidate plane visual.
    pub plane_size: (f32, f32),
    /// Height of the placed object above its surface (local Y).
    pub placed_offset: f32,
    /// Model instantiated on commit.
    pub placed_object: String,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            target_class: SurfaceClass::Table,
            merge_threshold: 0.30,
            merge_on_detect: true,
            gaze_threshold: 0.95,
            gaze_interval: Duration::from_millis(33),
            hide_unfocused: true,
            nudge_clamp: 0.03,
            nudge_step: 0.01,
            plane_size: (0.5, 0.5),
            placed_offset: 0.05,
            placed_object: "placed-model".to_string(),
        }
    }
}
