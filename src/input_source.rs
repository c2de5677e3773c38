//! Unified input stream for the placement session.
//!
//! `InputEvent` folds every producer (anchor detections, head pose,
//! gestures, confirmation) into one ordered stream, so a scripted
//! sequence can drive the whole session deterministically and the live
//! backend can replay the same script in real time.

use std::collections::VecDeque;
use std::time::Duration;

use crate::spatial::gesture::GesturePhase;
use crate::spatial::pose::Vec3;
use crate::spatial::registry::AnchorEvent;
use crate::spatial::visual::VisualHandle;

/// Which visual a scripted gesture lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureTarget {
    /// Whatever surface is highlighted when the gesture arrives.
    Focused,
    Visual(VisualHandle),
}

/// A unified input event for the placement session.
#[derive(Debug, Clone)]
pub enum InputEvent {
    /// Detector report.
    Anchor(AnchorEvent),
    /// Head pose: device at `from`, looking at `at`.
    Look { from: Vec3, at: Vec3 },
    /// Head tracking lost; pose queries return nothing until the next `Look`.
    TrackingLost,
    /// Two-contact rotation tick (cumulative angle, radians).
    Rotate {
        target: GestureTarget,
        phase: GesturePhase,
        angle: f32,
    },
    /// Single-contact drag tick (world-space point).
    Drag {
        target: GestureTarget,
        phase: GesturePhase,
        location: Vec3,
    },
    /// User pressed the confirm control.
    Confirm,
    /// Let time pass (gaze keeps polling meanwhile).
    Wait { duration: Duration },
}

impl InputEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Anchor(_) => "anchor",
            Self::Look { .. } => "look",
            Self::TrackingLost => "tracking-lost",
            Self::Rotate { .. } => "rotate",
            Self::Drag { .. } => "drag",
            Self::Confirm => "confirm",
            Self::Wait { .. } => "wait",
        }
    }

    pub fn wait_ms(ms: u64) -> Self {
        Self::Wait {
            duration: Duration::from_millis(ms),
        }
    }
}

/// Trait for providing input events to the session.
pub trait InputProvider: Send {
    /// Get the next input event, if any.
    fn next_event(&mut self) -> Option<InputEvent>;
    /// Whether there are more events to deliver.
    fn has_events(&self) -> bool;
}

/// A scripted input provider that delivers events from a pre-defined queue.
pub struct ScriptedInputProvider {
    events: VecDeque<InputEvent>,
}

impl ScriptedInputProvider {
    /// Create from a vector of events.
    pub fn new(events: Vec<InputEvent>) -> Self {
        Self {
            events: VecDeque::from(events),
        }
    }

    /// Number of remaining events.
    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl InputProvider for ScriptedInputProvider {
    fn next_event(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }

    fn has_events(&self) -> bool {
        !self.events.is_empty()
    }
}

/// A recording wrapper that keeps every event pulled from an inner provider.
pub struct RecordingProvider<P: InputProvider> {
    inner: P,
    recorded: Vec<InputEvent>,
}

impl<P: InputProvider> RecordingProvider<P> {
    /// Wrap an existing provider with recording.
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            recorded: Vec::new(),
        }
    }

    /// Get all recorded events.
    pub fn recorded(&self) -> &[InputEvent] {
        &self.recorded
    }

    /// Consume and return recorded events.
    pub fn into_recorded(self) -> Vec<InputEvent> {
        self.recorded
    }
}

impl<P: InputProvider> InputProvider for RecordingProvider<P> {
    fn next_event(&mut self) -> Option<InputEvent> {
        let event = self.inner.next_event()?;
        self.recorded.push(event.clone());
        Some(event)
    }

    fn has_events(&self) -> bool {
        self.inner.has_events()
    }
}
