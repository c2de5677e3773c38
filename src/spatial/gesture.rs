//! Hand-gesture interaction on the active surface: two-contact rotate
//! and single-contact drag ("nudge"), both locking the surface when the
//! gesture ends.
//!
//! Gestures only act on the active item's visual. The item captured at
//! gesture begin stays the target until the gesture ends, even if gaze
//! moves on in between.
//!
//! Both recognizers may be live at once. Every tick composes its
//! increment onto the item's current transform, so a rotation and a
//! nudge in flight together both survive.

use tracing::{debug, info};

use super::pose::{Mat4, Vec3};
use super::registry::{ItemId, SurfaceItem, SurfaceRegistry};
use super::visual::{VisualBackend, VisualHandle};

// ── Gesture input ────────────────────────────────────────────

/// Phase of a continuous gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Began,
    Changed,
    Ended,
}

impl GesturePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Began => "began",
            Self::Changed => "changed",
            Self::Ended => "ended",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "began" => Some(Self::Began),
            "changed" => Some(Self::Changed),
            "ended" => Some(Self::Ended),
            _ => None,
        }
    }
}

/// Two-contact rotation tick; `angle` is cumulative since the recognizer started.
#[derive(Debug, Clone, Copy)]
pub struct RotateGesture {
    pub target: VisualHandle,
    pub phase: GesturePhase,
    pub angle: f32,
}

/// Single-contact drag tick; `location` is in world space.
#[derive(Debug, Clone, Copy)]
pub struct DragGesture {
    pub target: VisualHandle,
    pub phase: GesturePhase,
    pub location: Vec3,
}

/// Effect of one gesture tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    Ignored,
    Started(ItemId),
    Moved(ItemId),
    Locked(ItemId),
}

// ── Sessions ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct RotateSession {
    item: ItemId,
    visual: VisualHandle,
    /// Cumulative angle already applied to the item.
    last_angle: f32,
}

#[derive(Debug, Clone, Copy)]
struct NudgeSession {
    item: ItemId,
    visual: VisualHandle,
    /// World-to-local transform of the item as it was at begin.
    begin_frame: Mat4,
    /// Drag point at begin plus every applied step, in `begin_frame`.
    last_hit: Vec3,
}

/// Clamp one axis of a nudge to `[-clamp, clamp]`, then snap it to `step`.
pub fn clamp_and_quantize(raw: f32, clamp: f32, step: f32) -> f32 {
    let clamped = raw.clamp(-clamp, clamp);
    if step <= 0.0 {
        return clamped;
    }
    (clamped / step).round() * step
}

// ── Controller ───────────────────────────────────────────────

/// Maps rotate and drag streams onto the active item's transform.
#[derive(Debug, Clone)]
pub struct InteractionController {
    pub nudge_clamp: f32,
    pub nudge_step: f32,
    rotate: Option<RotateSession>,
    nudge: Option<NudgeSession>,
}

impl InteractionController {
    pub fn new(nudge_clamp: f32, nudge_step: f32) -> Self {
        Self {
            nudge_clamp,
            nudge_step,
            rotate: None,
            nudge: None,
        }
    }

    pub fn is_rotating(&self) -> bool {
        self.rotate.is_some()
    }

    pub fn is_nudging(&self) -> bool {
        self.nudge.is_some()
    }

    /// Drop any live gesture session on `item` (it was removed).
    pub fn forget(&mut self, item: ItemId) {
        if self.rotate.is_some_and(|s| s.item == item) {
            self.rotate = None;
        }
        if self.nudge.is_some_and(|s| s.item == item) {
            self.nudge = None;
        }
    }

    /// Drop every live gesture session.
    pub fn reset(&mut self) {
        self.rotate = None;
        self.nudge = None;
    }

    pub fn on_rotate<V: VisualBackend + ?Sized>(
        &mut self,
        gesture: &RotateGesture,
        active: Option<ItemId>,
        registry: &mut SurfaceRegistry,
        visuals: &mut V,
    ) -> GestureOutcome {
        match gesture.phase {
            GesturePhase::Began => {
                let Some(item) = targeted_active(gesture.target, active, registry) else {
                    return GestureOutcome::Ignored;
                };
                let id = item.id;
                self.rotate = Some(RotateSession {
                    item: id,
                    visual: gesture.target,
                    last_angle: gesture.angle,
                });
                debug!("rotate began on item {} at {:.3} rad", id.0, gesture.angle);
                GestureOutcome::Started(id)
            }
            GesturePhase::Changed => {
                let Some(mut session) = self.rotate.filter(|s| s.visual == gesture.target) else {
                    return GestureOutcome::Ignored;
                };
                let Some(current) = registry.get(session.item).map(|i| i.transform) else {
                    self.rotate = None;
                    return GestureOutcome::Ignored;
                };
                let delta = gesture.angle - session.last_angle;
                if !registry.set_transform(session.item, current.mul(&Mat4::yaw(delta)), visuals) {
                    self.rotate = None;
                    return GestureOutcome::Ignored;
                }
                session.last_angle = gesture.angle;
                self.rotate = Some(session);
                GestureOutcome::Moved(session.item)
            }
            GesturePhase::Ended => {
                let Some(session) = self.rotate.filter(|s| s.visual == gesture.target) else {
                    return GestureOutcome::Ignored;
                };
                self.rotate = None;
                if !registry.lock(session.item) {
                    return GestureOutcome::Ignored;
                }
                info!("rotate ended, item {} locked", session.item.0);
                GestureOutcome::Locked(session.item)
            }
        }
    }

    pub fn on_drag<V: VisualBackend + ?Sized>(
        &mut self,
        gesture: &DragGesture,
        active: Option<ItemId>,
        registry: &mut SurfaceRegistry,
        visuals: &mut V,
    ) -> GestureOutcome {
        match gesture.phase {
            GesturePhase::Began => {
                let Some(item) = targeted_active(gesture.target, active, registry) else {
                    return GestureOutcome::Ignored;
                };
                let (id, begin_frame) = (item.id, item.transform.inverse_rigid());
                let last_hit = visuals.to_local(gesture.target, gesture.location);
                self.nudge = Some(NudgeSession {
                    item: id,
                    visual: gesture.target,
                    begin_frame,
                    last_hit,
                });
                debug!("nudge began on item {}", id.0);
                GestureOutcome::Started(id)
            }
            GesturePhase::Changed => {
                let Some(mut session) = self.nudge.filter(|s| s.visual == gesture.target) else {
                    return GestureOutcome::Ignored;
                };
                let Some(current) = registry.get(session.item).map(|i| i.transform) else {
                    self.nudge = None;
                    return GestureOutcome::Ignored;
                };
                let hit = session.begin_frame.transform_point(gesture.location);
                let dx = clamp_and_quantize(
                    hit.x - session.last_hit.x,
                    self.nudge_clamp,
                    self.nudge_step,
                );
                let dz = clamp_and_quantize(
                    hit.z - session.last_hit.z,
                    self.nudge_clamp,
                    self.nudge_step,
                );
                let transform = current.mul(&Mat4::translation(dx, 0.0, dz));
                if !registry.set_transform(session.item, transform, visuals) {
                    self.nudge = None;
                    return GestureOutcome::Ignored;
                }
                session.last_hit = session.last_hit.add(Vec3::new(dx, 0.0, dz));
                self.nudge = Some(session);
                GestureOutcome::Moved(session.item)
            }
            GesturePhase::Ended => {
                let Some(session) = self.nudge.filter(|s| s.visual == gesture.target) else {
                    return GestureOutcome::Ignored;
                };
                self.nudge = None;
                if !registry.lock(session.item) {
                    return GestureOutcome::Ignored;
                }
                info!("nudge ended, item {} locked", session.item.0);
                GestureOutcome::Locked(session.item)
            }
        }
    }
}

/// The active item, if `target` is its visual.
fn targeted_active(
    target: VisualHandle,
    active: Option<ItemId>,
    registry: &SurfaceRegistry,
) -> Option<&SurfaceItem> {
    let item = registry.get(active?)?;
    (item.visual == target).then_some(item)
}

// ── Tests ────────────────────────────────────────────────────
