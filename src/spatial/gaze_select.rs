//! Gaze selection: picks the single active placement candidate by
//! head-gaze alignment.
//!
//! Each tick scores every item by the cosine between the device forward
//! axis and the direction from the device to the item. The best item
//! becomes active if it clears `threshold`; otherwise the selection is
//! cleared. There is no hysteresis: a better-aligned item takes over on
//! the very next tick.

use tracing::{debug, trace};

use super::pose::Mat4;
use super::registry::{ItemId, SurfaceRegistry};
use super::visual::{Material, VisualBackend};

/// Emitted when the active item changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionChange {
    pub previous: Option<ItemId>,
    pub current: Option<ItemId>,
    /// Alignment score of the best candidate on this tick.
    pub score: Option<f32>,
}

impl SelectionChange {
    /// Convert to an s-expression for the event log.
    pub fn to_sexp(&self) -> String {
        let id = |i: Option<ItemId>| {
            i.map(|i| i.0.to_string())
                .unwrap_or_else(|| "nil".to_string())
        };
        let score = self
            .score
            .map(|s| format!("{:.3}", s))
            .unwrap_or_else(|| "nil".to_string());
        format!(
            "(:type :event :event :selection-changed :item {} :prev-item {} :score {})",
            id(self.current),
            id(self.previous),
            score
        )
    }
}

/// Alignment of `target` with the forward axis of `device` (cosine).
///
/// Zero when the target coincides with the device position.
pub fn alignment_score(device: &Mat4, target: &Mat4) -> f32 {
    let to_target = target.position().sub(device.position()).normalize();
    to_target.dot(device.forward())
}

/// Best-aligned item and its score; first-encountered maximum wins.
pub fn best_aligned(device: &Mat4, registry: &SurfaceRegistry) -> Option<(ItemId, f32)> {
    let mut best: Option<(ItemId, f32)> = None;
    for item in registry.items() {
        let score = alignment_score(device, &item.transform);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((item.id, score));
        }
    }
    best
}

/// Holds the active selection and applies focus styling.
#[derive(Debug, Clone)]
pub struct GazeSelector {
    pub threshold: f32,
    pub hide_unfocused: bool,
    active: Option<ItemId>,
    /// Ticks processed (including skipped ones).
    pub ticks: u64,
    /// Ticks skipped because the device pose was unavailable.
    pub missed_ticks: u64,
}

impl GazeSelector {
    pub fn new(threshold: f32, hide_unfocused: bool) -> Self {
        Self {
            threshold,
            hide_unfocused,
            active: None,
            ticks: 0,
            missed_ticks: 0,
        }
    }

    pub fn active(&self) -> Option<ItemId> {
        self.active
    }

    /// Run one gaze tick. Returns the change, if the active item changed.
    pub fn tick<V: VisualBackend + ?Sized>(
        &mut self,
        device: Option<Mat4>,
        registry: &SurfaceRegistry,
        visuals: &mut V,
    ) -> Option<SelectionChange> {
        self.ticks += 1;
        let Some(device) = device else {
            self.missed_ticks += 1;
            trace!("gaze: device pose unavailable, skipping tick");
            return None;
        };

        let best = best_aligned(&device, registry);
        let next = best
            .filter(|(_, score)| *score >= self.threshold)
            .map(|(id, _)| id);

        if next == self.active {
            return None;
        }

        let change = SelectionChange {
            previous: self.active,
            current: next,
            score: best.map(|(_, s)| s),
        };
        self.set_active(next, registry, visuals);
        debug!("gaze: {}", change.to_sexp());
        Some(change)
    }

    /// Switch the active item, restyling the previous and the new one.
    pub fn set_active<V: VisualBackend + ?Sized>(
        &mut self,
        next: Option<ItemId>,
        registry: &SurfaceRegistry,
        visuals: &mut V,
    ) {
        if let Some(prev) = self.active.and_then(|id| registry.get(id)) {
            visuals.set_material(prev.visual, Material::Idle);
            if self.hide_unfocused {
                visuals.set_enabled(prev.visual, false);
            }
        }
        if let Some(item) = next.and_then(|id| registry.get(id)) {
            visuals.set_material(item.visual, Material::Focus);
            visuals.set_enabled(item.visual, true);
        }
        self.active = next;
    }

    /// Drop the selection without restyling (the item no longer exists).
    pub fn forget(&mut self, id: ItemId) {
        if self.active == Some(id) {
            debug!("gaze: active item {} removed", id.0);
            self.active = None;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────
