//! Simulated sensing hardware for headless runs: a thread-backed surface
//! detector, a scriptable headset pose, and the built-in demo scenario.

use std::thread;
use std::time::Duration;

use calloop::channel::Sender;
use tracing::{debug, info};

use crate::capability::{Authorization, CapabilityError, PoseProvider, SurfaceDetector};
use crate::input_source::{GestureTarget, InputEvent};
use crate::spatial::config::SurfaceClass;
use crate::spatial::gesture::GesturePhase;
use crate::spatial::pose::{Mat4, Vec3};
use crate::spatial::registry::AnchorEvent;

/// Eye height of the simulated user (meters).
pub const EYE_HEIGHT: f32 = 1.5;

// ── Headset ──────────────────────────────────────────────────

/// Head pose source driven by `Look` / `TrackingLost` input.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedHeadset {
    pose: Option<Mat4>,
}

impl Default for SimulatedHeadset {
    fn default() -> Self {
        Self {
            pose: Some(Mat4::translation(0.0, EYE_HEIGHT, 0.0)),
        }
    }
}

impl SimulatedHeadset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn look(&mut self, from: Vec3, at: Vec3) {
        self.pose = Some(Mat4::look_at(from, at));
    }

    pub fn lose_tracking(&mut self) {
        self.pose = None;
    }
}

impl PoseProvider for SimulatedHeadset {
    fn device_pose(&self) -> Option<Mat4> {
        self.pose
    }
}

// ── Detector ─────────────────────────────────────────────────

/// Surface detector replaying a timed anchor schedule on its own thread.
pub struct SimulatedDetector {
    pub supported: bool,
    pub authorization: Authorization,
    /// (delay since previous anchor, event)
    schedule: Vec<(Duration, AnchorEvent)>,
    worker: Option<thread::JoinHandle<usize>>,
}

impl SimulatedDetector {
    pub fn new(schedule: Vec<(Duration, AnchorEvent)>) -> Self {
        Self {
            supported: true,
            authorization: Authorization::Allowed,
            schedule,
            worker: None,
        }
    }

    /// Wait for the producer thread; returns how many events it delivered.
    pub fn join(&mut self) -> Option<usize> {
        self.worker.take().and_then(|w| w.join().ok())
    }
}

impl SurfaceDetector for SimulatedDetector {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn request_authorization(&mut self) -> Authorization {
        self.authorization
    }

    fn start(&mut self, sink: Sender<AnchorEvent>) -> Result<(), CapabilityError> {
        let schedule = std::mem::take(&mut self.schedule);
        let count = schedule.len();
        let worker = thread::Builder::new()
            .name("surface-detector".into())
            .spawn(move || {
                let mut delivered = 0;
                for (delay, event) in schedule {
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                    if sink.send(event).is_err() {
                        debug!("detector: stream closed, stopping after {} events", delivered);
                        break;
                    }
                    delivered += 1;
                }
                delivered
            })
            .map_err(|e| CapabilityError::StartFailed(e.to_string()))?;
        self.worker = Some(worker);
        info!("simulated detector streaming {} anchor event(s)", count);
        Ok(())
    }
}

// ── Scripts ──────────────────────────────────────────────────

/// Pull anchor events out of a script, timing each relative to the previous
/// one by the `Wait`s before it. The remaining events keep their waits.
pub fn split_anchors(events: Vec<InputEvent>) -> (Vec<(Duration, AnchorEvent)>, Vec<InputEvent>) {
    let mut anchors = Vec::new();
    let mut rest = Vec::new();
    let mut elapsed = Duration::ZERO;
    let mut last_anchor = Duration::ZERO;

    for event in events {
        match event {
            InputEvent::Anchor(anchor) => {
                anchors.push((elapsed - last_anchor, anchor));
                last_anchor = elapsed;
            }
            InputEvent::Wait { duration } => {
                elapsed += duration;
                rest.push(InputEvent::Wait { duration });
            }
            other => rest.push(other),
        }
    }
    (anchors, rest)
}

fn eye() -> Vec3 {
    Vec3::new(0.0, EYE_HEIGHT, 0.0)
}

fn table(anchor: u64, x: f32, y: f32, z: f32) -> InputEvent {
    InputEvent::Anchor(AnchorEvent::added(
        anchor,
        Mat4::translation(x, y, z),
        SurfaceClass::Table,
    ))
}

/// Built-in scenario: two overlapping detections of one table, a floor,
/// a second table, then select, rotate, nudge and confirm on the first.
pub fn demo_script() -> Vec<InputEvent> {
    let near = Vec3::new(0.1, 0.7, -1.1);
    let far = Vec3::new(1.6, 0.7, -1.4);
    vec![
        table(1, 0.0, 0.72, -1.2),
        table(2, 0.1, 0.7, -1.1),
        InputEvent::Anchor(AnchorEvent::added(
            3,
            Mat4::translation(0.0, 0.0, -1.0),
            SurfaceClass::Floor,
        )),
        InputEvent::wait_ms(100),
        table(4, far.x, far.y, far.z),
        InputEvent::Look { from: eye(), at: near },
        InputEvent::wait_ms(200),
        InputEvent::Anchor(AnchorEvent::updated(
            1,
            Mat4::translation(0.08, 0.71, -1.12),
            SurfaceClass::Table,
        )),
        InputEvent::Rotate {
            target: GestureTarget::Focused,
            phase: GesturePhase::Began,
            angle: 0.0,
        },
        InputEvent::Rotate {
            target: GestureTarget::Focused,
            phase: GesturePhase::Changed,
            angle: 0.4,
        },
        InputEvent::Rotate {
            target: GestureTarget::Focused,
            phase: GesturePhase::Ended,
            angle: 0.8,
        },
        InputEvent::wait_ms(100),
        // Frozen: the table is locked now.
        InputEvent::Anchor(AnchorEvent::updated(
            2,
            Mat4::translation(0.3, 0.7, -1.0),
            SurfaceClass::Table,
        )),
        InputEvent::Drag {
            target: GestureTarget::Focused,
            phase: GesturePhase::Began,
            location: near,
        },
        InputEvent::Drag {
            target: GestureTarget::Focused,
            phase: GesturePhase::Changed,
            location: near.add(Vec3::new(0.1, 0.0, 0.0)),
        },
        InputEvent::Drag {
            target: GestureTarget::Focused,
            phase: GesturePhase::Ended,
            location: near.add(Vec3::new(0.1, 0.0, 0.0)),
        },
        InputEvent::TrackingLost,
        InputEvent::wait_ms(100),
        InputEvent::Look { from: eye(), at: far },
        InputEvent::wait_ms(200),
        InputEvent::Look { from: eye(), at: near },
        InputEvent::wait_ms(200),
        InputEvent::Confirm,
        InputEvent::wait_ms(100),
        table(5, -2.0, 0.7, -2.0),
    ]
}
