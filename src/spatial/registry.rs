//! Surface registry: fuses noisy, overlapping plane detections into a
//! de-duplicated, identity-stable set of placement candidates.
//!
//! Detectors frequently report several anchors for one physical table.
//! Each incoming detection is merged greedily into the nearest existing
//! item within `merge_threshold` on the ground plane, so repeated or
//! overlapping anchors collapse into one stable item without a full
//! clustering pass (O(n) per event).
//!
//! Items are never deleted because their anchor stopped being tracked:
//! the last known pose is retained. The only removal path is the orphan
//! cleanup that happens when an anchor is re-keyed onto another item.

use std::collections::HashMap;
use tracing::{debug, info};

use super::config::{PlacementConfig, SurfaceClass};
use super::pose::{distance_xz, Mat4};
use super::visual::{Material, VisualBackend, VisualHandle};

// ── Identities ───────────────────────────────────────────────

/// Raw per-anchor identity as reported by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnchorId(pub u64);

/// Stable identity of a managed surface item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

// ── Detection events ─────────────────────────────────────────

/// Kind of anchor update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorEventKind {
    Added,
    Updated,
    Removed,
}

impl AnchorEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Updated => "updated",
            Self::Removed => "removed",
        }
    }
}

/// One report from the surface detector.
#[derive(Debug, Clone, Copy)]
pub struct AnchorEvent {
    pub anchor: AnchorId,
    pub pose: Mat4,
    pub class: SurfaceClass,
    pub kind: AnchorEventKind,
}

impl AnchorEvent {
    pub fn new(anchor: u64, pose: Mat4, class: SurfaceClass, kind: AnchorEventKind) -> Self {
        Self {
            anchor: AnchorId(anchor),
            pose,
            class,
            kind,
        }
    }

    pub fn added(anchor: u64, pose: Mat4, class: SurfaceClass) -> Self {
        Self::new(anchor, pose, class, AnchorEventKind::Added)
    }

    pub fn updated(anchor: u64, pose: Mat4, class: SurfaceClass) -> Self {
        Self::new(anchor, pose, class, AnchorEventKind::Updated)
    }

    pub fn removed(anchor: u64, pose: Mat4, class: SurfaceClass) -> Self {
        Self::new(anchor, pose, class, AnchorEventKind::Removed)
    }
}

// ── Items ────────────────────────────────────────────────────

/// One managed placement candidate.
#[derive(Debug, Clone)]
pub struct SurfaceItem {
    pub id: ItemId,
    pub transform: Mat4,
    pub visual: VisualHandle,
    /// Once set, detection events never touch this item again.
    pub locked: bool,
}

/// Why a detection was dropped without touching the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Removed,
    ClassMismatch,
}

/// What a single detection did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionOutcome {
    Ignored(IgnoreReason),
    /// The anchor's item is locked.
    Frozen { item: ItemId },
    Created { item: ItemId },
    /// Transform overwritten on the anchor's own item.
    Updated { item: ItemId },
    /// Anchor re-keyed onto another item; `orphan` was dropped as a result.
    Merged { item: ItemId, orphan: Option<ItemId> },
}

// ── Registry ─────────────────────────────────────────────────

/// De-duplicated set of detected surfaces.
#[derive(Debug)]
pub struct SurfaceRegistry {
    items: HashMap<ItemId, SurfaceItem>,
    anchors: HashMap<AnchorId, ItemId>,
    next_id: u64,
    target_class: SurfaceClass,
    merge_threshold: f32,
    merge_on_detect: bool,
    plane_size: (f32, f32),
    show_new: bool,
}

impl SurfaceRegistry {
    pub fn new(config: &PlacementConfig) -> Self {
        Self {
            items: HashMap::new(),
            anchors: HashMap::new(),
            next_id: 0,
            target_class: config.target_class,
            merge_threshold: config.merge_threshold,
            merge_on_detect: config.merge_on_detect,
            plane_size: config.plane_size,
            show_new: !config.hide_unfocused,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ItemId) -> Option<&SurfaceItem> {
        self.items.get(&id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn items(&self) -> impl Iterator<Item = &SurfaceItem> {
        self.items.values()
    }

    /// Item ids in ascending order.
    pub fn ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self.items.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn item_for_anchor(&self, anchor: AnchorId) -> Option<ItemId> {
        self.anchors.get(&anchor).copied()
    }

    /// Item whose visual is `handle`.
    pub fn item_for_visual(&self, handle: VisualHandle) -> Option<ItemId> {
        self.items.values().find(|i| i.visual == handle).map(|i| i.id)
    }

    /// Fold one detection event into the registry.
    pub fn apply<V: VisualBackend + ?Sized>(
        &mut self,
        event: &AnchorEvent,
        visuals: &mut V,
    ) -> DetectionOutcome {
        if event.kind == AnchorEventKind::Removed {
            debug!("registry: anchor {} removed, retaining last pose", event.anchor.0);
            return DetectionOutcome::Ignored(IgnoreReason::Removed);
        }

        if event.class != self.target_class {
            debug!(
                "registry: anchor {} ignored, class {} != {}",
                event.anchor.0,
                event.class.as_str(),
                self.target_class.as_str()
            );
            return DetectionOutcome::Ignored(IgnoreReason::ClassMismatch);
        }

        let keyed = self.anchors.get(&event.anchor).copied();
        if let Some(id) = keyed {
            if self.items.get(&id).is_some_and(|i| i.locked) {
                return DetectionOutcome::Frozen { item: id };
            }
        }

        match (self.nearest_within_threshold(&event.pose), keyed) {
            (Some(found), Some(current)) if found == current => {
                self.overwrite_if_unlocked(found, event.pose, visuals);
                DetectionOutcome::Updated { item: found }
            }
            (Some(found), previous) => {
                self.anchors.insert(event.anchor, found);
                let orphan = previous.filter(|prev| !self.anchors.values().any(|i| i == prev));
                if let Some(orphan_id) = orphan {
                    if let Some(item) = self.items.remove(&orphan_id) {
                        visuals.release(item.visual);
                    }
                }
                self.overwrite_if_unlocked(found, event.pose, visuals);
                debug!(
                    "registry: anchor {} merged into item {} (orphan {:?})",
                    event.anchor.0, found.0, orphan
                );
                DetectionOutcome::Merged {
                    item: found,
                    orphan,
                }
            }
            (None, Some(current)) => {
                self.overwrite_if_unlocked(current, event.pose, visuals);
                DetectionOutcome::Updated { item: current }
            }
            (None, None) => {
                let id = self.create(event.pose, visuals);
                self.anchors.insert(event.anchor, id);
                DetectionOutcome::Created { item: id }
            }
        }
    }

    /// Replace an item's transform and mirror it onto its visual.
    ///
    /// This is the gesture path: it ignores the lock flag.
    pub fn set_transform<V: VisualBackend + ?Sized>(
        &mut self,
        id: ItemId,
        transform: Mat4,
        visuals: &mut V,
    ) -> bool {
        match self.items.get_mut(&id) {
            Some(item) => {
                item.transform = transform;
                visuals.set_transform(item.visual, transform);
                true
            }
            None => false,
        }
    }

    /// Freeze an item against further detection input.
    pub fn lock(&mut self, id: ItemId) -> bool {
        match self.items.get_mut(&id) {
            Some(item) => {
                if !item.locked {
                    item.locked = true;
                    info!("registry: item {} locked", id.0);
                }
                true
            }
            None => false,
        }
    }

    /// Nearest item strictly closer than the merge threshold on the XZ plane.
    fn nearest_within_threshold(&self, pose: &Mat4) -> Option<ItemId> {
        if !self.merge_on_detect {
            return None;
        }
        let mut best: Option<(ItemId, f32)> = None;
        for item in self.items.values() {
            let d = distance_xz(&item.transform, pose);
            if d >= self.merge_threshold {
                continue;
            }
            if best.map_or(true, |(_, best_d)| d < best_d) {
                best = Some((item.id, d));
            }
        }
        best.map(|(id, _)| id)
    }

    fn overwrite_if_unlocked<V: VisualBackend + ?Sized>(
        &mut self,
        id: ItemId,
        pose: Mat4,
        visuals: &mut V,
    ) {
        if let Some(item) = self.items.get_mut(&id) {
            if !item.locked {
                item.transform = pose;
                visuals.set_transform(item.visual, pose);
            }
        }
    }

    fn create<V: VisualBackend + ?Sized>(&mut self, pose: Mat4, visuals: &mut V) -> ItemId {
        self.next_id += 1;
        let id = ItemId(self.next_id);
        let visual = visuals.create_plane_visual(self.plane_size, Material::Idle);
        visuals.set_transform(visual, pose);
        visuals.set_enabled(visual, self.show_new);
        self.items.insert(
            id,
            SurfaceItem {
                id,
                transform: pose,
                visual,
                locked: false,
            },
        );
        info!("registry: item {} created (visual {})", id.0, visual.0);
        id
    }
}

// ── Tests ────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::visual::HeadlessScene;

    fn at(x: f32, z: f32) -> Mat4 {
        Mat4::translation(x, 0.7, z)
    }

    fn registry() -> (SurfaceRegistry, HeadlessScene) {
        (
            SurfaceRegistry::new(&PlacementConfig::default()),
            HeadlessScene::new(),
        )
    }

    #[test]
    fn test_three_detections_two_items() {
        let (mut reg, mut scene) = registry();
        reg.apply(&AnchorEvent::added(1, at(0.0, 0.0), SurfaceClass::Table), &mut scene);
        reg.apply(&AnchorEvent::added(2, at(0.1, 0.1), SurfaceClass::Table), &mut scene);
        reg.apply(&AnchorEvent::added(3, at(5.0, 5.0), SurfaceClass::Table), &mut scene);

        assert_eq!(reg.len(), 2);
        assert_eq!(scene.plane_count(), 2);
        assert_eq!(reg.item_for_anchor(AnchorId(1)), reg.item_for_anchor(AnchorId(2)));
        assert_ne!(reg.item_for_anchor(AnchorId(1)), reg.item_for_anchor(AnchorId(3)));
    }

    #[test]
    fn test_merge_overwrites_transform() {
        let (mut reg, mut scene) = registry();
        reg.apply(&AnchorEvent::added(1, at(0.0, 0.0), SurfaceClass::Table), &mut scene);
        let outcome =
            reg.apply(&AnchorEvent::added(2, at(0.1, 0.0), SurfaceClass::Table), &mut scene);
        let id = ItemId(1);
        assert_eq!(outcome, DetectionOutcome::Merged { item: id, orphan: None });
        let item = reg.get(id).unwrap();
        assert!((item.transform.position().x - 0.1).abs() < 1e-6);
        // Visual follows the item.
        assert_eq!(scene.node(item.visual).unwrap().transform, item.transform);
    }

    #[test]
    fn test_merge_boundary_is_strict() {
        let (mut reg, mut scene) = registry();
        reg.apply(&AnchorEvent::added(1, at(0.0, 0.0), SurfaceClass::Table), &mut scene);
        reg.apply(&AnchorEvent::added(2, at(0.3, 0.0), SurfaceClass::Table), &mut scene);
        assert_eq!(reg.len(), 2, "exactly at threshold must not merge");

        let (mut reg, mut scene) = registry();
        reg.apply(&AnchorEvent::added(1, at(0.0, 0.0), SurfaceClass::Table), &mut scene);
        reg.apply(&AnchorEvent::added(2, at(0.29, 0.0), SurfaceClass::Table), &mut scene);
        assert_eq!(reg.len(), 1, "just below threshold must merge");
    }

    #[test]
    fn test_height_does_not_affect_merge() {
        let (mut reg, mut scene) = registry();
        reg.apply(
            &AnchorEvent::added(1, Mat4::translation(0.0, 0.4, 0.0), SurfaceClass::Table),
            &mut scene,
        );
        reg.apply(
            &AnchorEvent::added(2, Mat4::translation(0.05, 1.2, 0.0), SurfaceClass::Table),
            &mut scene,
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_removed_is_noop() {
        let (mut reg, mut scene) = registry();
        reg.apply(&AnchorEvent::added(1, at(0.0, 0.0), SurfaceClass::Table), &mut scene);
        let outcome =
            reg.apply(&AnchorEvent::removed(1, at(3.0, 3.0), SurfaceClass::Table), &mut scene);
        assert_eq!(outcome, DetectionOutcome::Ignored(IgnoreReason::Removed));
        assert_eq!(reg.len(), 1);
        let item = reg.get(ItemId(1)).unwrap();
        assert_eq!(item.transform, at(0.0, 0.0));
    }

    #[test]
    fn test_class_mismatch_ignored() {
        let (mut reg, mut scene) = registry();
        let outcome =
            reg.apply(&AnchorEvent::added(1, at(0.0, 0.0), SurfaceClass::Floor), &mut scene);
        assert_eq!(outcome, DetectionOutcome::Ignored(IgnoreReason::ClassMismatch));
        assert!(reg.is_empty());
        assert!(scene.nodes.is_empty());
    }

    #[test]
    fn test_locked_item_frozen() {
        let (mut reg, mut scene) = registry();
        reg.apply(&AnchorEvent::added(1, at(0.0, 0.0), SurfaceClass::Table), &mut scene);
        reg.lock(ItemId(1));

        let outcome =
            reg.apply(&AnchorEvent::updated(1, at(0.2, 0.0), SurfaceClass::Table), &mut scene);
        assert_eq!(outcome, DetectionOutcome::Frozen { item: ItemId(1) });

        // A different anchor landing within range merges but cannot move it.
        let outcome =
            reg.apply(&AnchorEvent::added(7, at(0.1, 0.1), SurfaceClass::Table), &mut scene);
        assert_eq!(outcome, DetectionOutcome::Merged { item: ItemId(1), orphan: None });
        assert_eq!(reg.get(ItemId(1)).unwrap().transform, at(0.0, 0.0));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_rekey_releases_orphan() {
        let (mut reg, mut scene) = registry();
        // Two separate items.
        reg.apply(&AnchorEvent::added(1, at(0.0, 0.0), SurfaceClass::Table), &mut scene);
        reg.apply(&AnchorEvent::added(2, at(1.0, 0.0), SurfaceClass::Table), &mut scene);
        assert_eq!(reg.len(), 2);
        let orphan_visual = reg.get(ItemId(2)).unwrap().visual;

        // Anchor 2 drifts onto item 1: its old item is now unreferenced.
        let outcome =
            reg.apply(&AnchorEvent::updated(2, at(0.1, 0.0), SurfaceClass::Table), &mut scene);
        assert_eq!(
            outcome,
            DetectionOutcome::Merged {
                item: ItemId(1),
                orphan: Some(ItemId(2))
            }
        );
        assert_eq!(reg.len(), 1);
        assert!(scene.node(orphan_visual).is_none(), "orphan visual must be released");
        assert_eq!(scene.plane_count(), 1);
    }

    #[test]
    fn test_shared_item_not_orphaned() {
        let (mut reg, mut scene) = registry();
        reg.apply(&AnchorEvent::added(1, at(0.0, 0.0), SurfaceClass::Table), &mut scene);
        reg.apply(&AnchorEvent::added(2, at(0.1, 0.0), SurfaceClass::Table), &mut scene);
        reg.apply(&AnchorEvent::added(3, at(2.0, 0.0), SurfaceClass::Table), &mut scene);
        // Anchor 2 jumps to item 3; item 1 is still held by anchor 1.
        let outcome =
            reg.apply(&AnchorEvent::updated(2, at(2.1, 0.0), SurfaceClass::Table), &mut scene);
        assert_eq!(outcome, DetectionOutcome::Merged { item: ItemId(2), orphan: None });
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_update_far_move_keeps_identity() {
        let (mut reg, mut scene) = registry();
        reg.apply(&AnchorEvent::added(1, at(0.0, 0.0), SurfaceClass::Table), &mut scene);
        let outcome =
            reg.apply(&AnchorEvent::updated(1, at(4.0, 0.0), SurfaceClass::Table), &mut scene);
        assert_eq!(outcome, DetectionOutcome::Updated { item: ItemId(1) });
        assert_eq!(reg.get(ItemId(1)).unwrap().transform, at(4.0, 0.0));
    }

    #[test]
    fn test_merge_disabled() {
        let config = PlacementConfig {
            merge_on_detect: false,
            ..Default::default()
        };
        let mut reg = SurfaceRegistry::new(&config);
        let mut scene = HeadlessScene::new();
        reg.apply(&AnchorEvent::added(1, at(0.0, 0.0), SurfaceClass::Table), &mut scene);
        reg.apply(&AnchorEvent::added(2, at(0.01, 0.0), SurfaceClass::Table), &mut scene);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_new_visual_hidden_when_hiding_unfocused() {
        let (mut reg, mut scene) = registry();
        reg.apply(&AnchorEvent::added(1, at(0.0, 0.0), SurfaceClass::Table), &mut scene);
        let visual = reg.get(ItemId(1)).unwrap().visual;
        assert!(!scene.is_enabled(visual));
        assert_eq!(reg.item_for_visual(visual), Some(ItemId(1)));
    }
}
