//! Session drivers: real-time calloop loop and deterministic replay.
//!
//! Both feed the same `InputEvent` stream through [`dispatch_input`], so a
//! script behaves identically whichever backend runs it.

use tracing::{debug, info, trace};

use crate::input_source::{GestureTarget, InputEvent};
use crate::spatial::gesture::{DragGesture, GestureOutcome, RotateGesture};
use crate::spatial::registry::DetectionOutcome;
use crate::spatial::visual::{VisualBackend, VisualHandle};
use crate::spatial::{PlacementConfig, PlacementSession};

pub mod headless;
pub mod replay;
pub mod simulated;

pub use simulated::SimulatedHeadset;

/// Backend type selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// calloop event loop, threads and timers in real time.
    Headless,
    /// Single-threaded scripted replay on the system clock.
    Replay,
}

impl BackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Headless => "headless",
            Self::Replay => "replay",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "headless" => Some(Self::Headless),
            "replay" => Some(Self::Replay),
            _ => None,
        }
    }
}

/// Simulated capability switches passed to backends.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulationConfig {
    pub unsupported: bool,
    pub denied: bool,
}

/// Run the built-in demo scenario with the selected backend.
pub fn run(
    backend: BackendType,
    config: PlacementConfig,
    exit_after: Option<u64>,
    simulation: SimulationConfig,
) -> anyhow::Result<()> {
    let script = simulated::demo_script();
    match backend {
        BackendType::Headless => {
            headless::run(config, script, exit_after, simulation).map(|_| ())
        }
        BackendType::Replay => {
            let summary = replay::run(config, script, simulation);
            info!(
                "replay finished: {} event(s), {} gaze tick(s), placed: {}",
                summary.events,
                summary.gaze_ticks,
                summary.placement.is_some()
            );
            Ok(())
        }
    }
}

fn resolve_target<V: VisualBackend>(
    session: &PlacementSession<V>,
    target: GestureTarget,
) -> Option<VisualHandle> {
    match target {
        GestureTarget::Focused => session.active_visual(),
        GestureTarget::Visual(handle) => Some(handle),
    }
}

/// Route one input event into the session and the headset.
///
/// `Wait` is not handled here; its duration is handed back to the driver.
pub fn dispatch_input<V: VisualBackend>(
    session: &mut PlacementSession<V>,
    headset: &mut SimulatedHeadset,
    event: InputEvent,
) -> Option<std::time::Duration> {
    trace!("input: {}", event.kind());
    match event {
        InputEvent::Anchor(anchor) => match session.handle_anchor(&anchor) {
            Some(DetectionOutcome::Ignored(reason)) => {
                debug!("anchor {} ignored: {:?}", anchor.anchor.0, reason);
            }
            Some(outcome) => debug!("anchor {}: {:?}", anchor.anchor.0, outcome),
            None => debug!("anchor {} dropped: session confirmed", anchor.anchor.0),
        },
        InputEvent::Look { from, at } => headset.look(from, at),
        InputEvent::TrackingLost => {
            debug!("head tracking lost");
            headset.lose_tracking();
        }
        InputEvent::Rotate {
            target,
            phase,
            angle,
        } => {
            let Some(target) = resolve_target(session, target) else {
                debug!("rotate {} ignored: nothing focused", phase.as_str());
                return None;
            };
            let outcome = session.handle_rotate(&RotateGesture {
                target,
                phase,
                angle,
            });
            log_gesture("rotate", outcome);
        }
        InputEvent::Drag {
            target,
            phase,
            location,
        } => {
            let Some(target) = resolve_target(session, target) else {
                debug!("drag {} ignored: nothing focused", phase.as_str());
                return None;
            };
            let outcome = session.handle_drag(&DragGesture {
                target,
                phase,
                location,
            });
            log_gesture("drag", outcome);
        }
        InputEvent::Confirm => match session.confirm() {
            Ok(placement) => info!(
                "placement confirmed on item {} (object {:?})",
                placement.item.0, placement.object
            ),
            Err(e) => debug!("confirm rejected: {}", e),
        },
        InputEvent::Wait { duration } => return Some(duration),
    }
    None
}

fn log_gesture(kind: &str, outcome: GestureOutcome) {
    match outcome {
        GestureOutcome::Locked(item) => info!("{}: item {} locked", kind, item.0),
        GestureOutcome::Ignored => debug!("{} ignored", kind),
        other => debug!("{}: {:?}", kind, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::config::SurfaceClass;
    use crate::spatial::gesture::GesturePhase;
    use crate::spatial::pose::{Mat4, Vec3};
    use crate::spatial::registry::{AnchorEvent, ItemId};
    use crate::spatial::visual::HeadlessScene;

    fn session() -> PlacementSession<HeadlessScene> {
        PlacementSession::new(PlacementConfig::default(), HeadlessScene::new())
    }

    #[test]
    fn test_backend_type_from_str() {
        assert_eq!(BackendType::from_str("headless"), Some(BackendType::Headless));
        assert_eq!(BackendType::from_str("replay"), Some(BackendType::Replay));
        assert_eq!(BackendType::from_str("winit"), None);
        assert_eq!(BackendType::Replay.as_str(), "replay");
    }

    #[test]
    fn test_focused_gesture_without_selection() {
        let mut s = session();
        let mut headset = SimulatedHeadset::new();
        dispatch_input(
            &mut s,
            &mut headset,
            InputEvent::Anchor(AnchorEvent::added(
                1,
                Mat4::translation(0.0, 0.7, -1.0),
                SurfaceClass::Table,
            )),
        );
        let wait = dispatch_input(
            &mut s,
            &mut headset,
            InputEvent::Rotate {
                target: GestureTarget::Focused,
                phase: GesturePhase::Began,
                angle: 0.0,
            },
        );
        assert!(wait.is_none());
        assert!(!s.interaction().is_rotating());
    }

    #[test]
    fn test_focused_gesture_hits_active() {
        let mut s = session();
        let mut headset = SimulatedHeadset::new();
        dispatch_input(
            &mut s,
            &mut headset,
            InputEvent::Anchor(AnchorEvent::added(
                1,
                Mat4::translation(0.0, 0.7, -1.0),
                SurfaceClass::Table,
            )),
        );
        dispatch_input(
            &mut s,
            &mut headset,
            InputEvent::Look {
                from: Vec3::new(0.0, 1.5, 0.0),
                at: Vec3::new(0.0, 0.7, -1.0),
            },
        );
        s.gaze_tick(headset_pose(&headset));
        assert_eq!(s.active(), Some(ItemId(1)));

        for (phase, angle) in [(GesturePhase::Began, 0.0), (GesturePhase::Ended, 0.5)] {
            dispatch_input(
                &mut s,
                &mut headset,
                InputEvent::Rotate {
                    target: GestureTarget::Focused,
                    phase,
                    angle,
                },
            );
        }
        assert!(s.registry.get(ItemId(1)).unwrap().locked);
    }

    #[test]
    fn test_wait_returned_to_driver() {
        let mut s = session();
        let mut headset = SimulatedHeadset::new();
        let wait = dispatch_input(&mut s, &mut headset, InputEvent::wait_ms(40));
        assert_eq!(wait, Some(std::time::Duration::from_millis(40)));
    }

    #[test]
    fn test_tracking_lost_clears_pose() {
        let mut s = session();
        let mut headset = SimulatedHeadset::new();
        dispatch_input(&mut s, &mut headset, InputEvent::TrackingLost);
        assert!(headset_pose(&headset).is_none());
    }

    fn headset_pose(headset: &SimulatedHeadset) -> Option<Mat4> {
        use crate::capability::PoseProvider;
        headset.device_pose()
    }
}
