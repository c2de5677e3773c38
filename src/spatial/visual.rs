//! Renderable capability: the seam between the placement core and the
//! 3D engine that owns the actual entities.
//!
//! `HeadlessScene` is an in-process implementation that records the scene
//! graph (materials, visibility, local transforms, parent links) without
//! rendering anything. The headless backend and the tests run on it.

use std::collections::HashMap;
use tracing::debug;

use super::pose::{Mat4, Vec3};

/// Opaque reference to a collaborator-owned renderable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisualHandle(pub u64);

/// Appearance of a candidate surface plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Material {
    /// Candidate not under gaze.
    Idle,
    /// Candidate currently selected by gaze.
    Focus,
}

impl Material {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Focus => "focus",
        }
    }
}

/// Operations the placement core needs from the 3D engine.
pub trait VisualBackend {
    /// Create a flat plane of `size` (width, depth) with the given material.
    fn create_plane_visual(&mut self, size: (f32, f32), material: Material) -> VisualHandle;

    /// Instantiate a named model (the object being placed).
    fn spawn_object(&mut self, name: &str) -> VisualHandle;

    fn set_material(&mut self, handle: VisualHandle, material: Material);

    fn set_enabled(&mut self, handle: VisualHandle, enabled: bool);

    /// Set the transform relative to the parent (or world when unparented).
    fn set_transform(&mut self, handle: VisualHandle, transform: Mat4);

    /// Make `child` a child of `parent`; the child's transform becomes local.
    fn attach(&mut self, parent: VisualHandle, child: VisualHandle);

    /// Detach and destroy a visual.
    fn release(&mut self, handle: VisualHandle);

    /// Express a world-space point in the local frame of `handle`.
    fn to_local(&self, handle: VisualHandle, world_point: Vec3) -> Vec3;
}

// ── Headless scene ───────────────────────────────────────────

/// What a headless node was created as.
#[derive(Debug, Clone, PartialEq)]
pub enum VisualKind {
    Plane { width: f32, depth: f32 },
    Object { name: String },
}

/// A node in the headless scene graph.
#[derive(Debug, Clone)]
pub struct VisualNode {
    pub kind: VisualKind,
    pub material: Option<Material>,
    pub enabled: bool,
    pub transform: Mat4,
    pub parent: Option<VisualHandle>,
    pub children: Vec<VisualHandle>,
}

/// In-process scene graph implementing [`VisualBackend`].
#[derive(Debug, Default)]
pub struct HeadlessScene {
    pub nodes: HashMap<VisualHandle, VisualNode>,
    next_id: u64,
    /// Total number of `release` calls that removed a node.
    pub released: usize,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, kind: VisualKind, material: Option<Material>) -> VisualHandle {
        self.next_id += 1;
        let handle = VisualHandle(self.next_id);
        self.nodes.insert(
            handle,
            VisualNode {
                kind,
                material,
                enabled: true,
                transform: Mat4::IDENTITY,
                parent: None,
                children: Vec::new(),
            },
        );
        handle
    }

    pub fn node(&self, handle: VisualHandle) -> Option<&VisualNode> {
        self.nodes.get(&handle)
    }

    pub fn is_enabled(&self, handle: VisualHandle) -> bool {
        self.nodes.get(&handle).is_some_and(|n| n.enabled)
    }

    pub fn material(&self, handle: VisualHandle) -> Option<Material> {
        self.nodes.get(&handle).and_then(|n| n.material)
    }

    /// World transform, composing parent transforms up to the root.
    pub fn world_transform(&self, handle: VisualHandle) -> Mat4 {
        let mut transform = Mat4::IDENTITY;
        let mut cursor = Some(handle);
        while let Some(h) = cursor {
            match self.nodes.get(&h) {
                Some(node) => {
                    transform = node.transform.mul(&transform);
                    cursor = node.parent;
                }
                None => break,
            }
        }
        transform
    }

    /// Number of live plane visuals.
    pub fn plane_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|n| matches!(n.kind, VisualKind::Plane { .. }))
            .count()
    }

    /// Handles of every spawned (non-plane) object.
    pub fn objects(&self) -> Vec<VisualHandle> {
        let mut out: Vec<VisualHandle> = self
            .nodes
            .iter()
            .filter(|(_, n)| matches!(n.kind, VisualKind::Object { .. }))
            .map(|(h, _)| *h)
            .collect();
        out.sort();
        out
    }
}

impl VisualBackend for HeadlessScene {
    fn create_plane_visual(&mut self, size: (f32, f32), material: Material) -> VisualHandle {
        let handle = self.insert(
            VisualKind::Plane {
                width: size.0,
                depth: size.1,
            },
            Some(material),
        );
        debug!("headless scene: plane {:?} ({}x{})", handle, size.0, size.1);
        handle
    }

    fn spawn_object(&mut self, name: &str) -> VisualHandle {
        let handle = self.insert(
            VisualKind::Object {
                name: name.to_string(),
            },
            None,
        );
        debug!("headless scene: object {:?} '{}'", handle, name);
        handle
    }

    fn set_material(&mut self, handle: VisualHandle, material: Material) {
        if let Some(node) = self.nodes.get_mut(&handle) {
            node.material = Some(material);
        }
    }

    fn set_enabled(&mut self, handle: VisualHandle, enabled: bool) {
        if let Some(node) = self.nodes.get_mut(&handle) {
            node.enabled = enabled;
        }
    }

    fn set_transform(&mut self, handle: VisualHandle, transform: Mat4) {
        if let Some(node) = self.nodes.get_mut(&handle) {
            node.transform = transform;
        }
    }

    fn attach(&mut self, parent: VisualHandle, child: VisualHandle) {
        if !self.nodes.contains_key(&parent) {
            return;
        }
        let old_parent = match self.nodes.get_mut(&child) {
            Some(node) => node.parent.replace(parent),
            None => return,
        };
        if let Some(old) = old_parent.and_then(|p| self.nodes.get_mut(&p)) {
            old.children.retain(|c| *c != child);
        }
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(child);
        }
    }

    fn release(&mut self, handle: VisualHandle) {
        let Some(node) = self.nodes.remove(&handle) else {
            return;
        };
        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != handle);
        }
        for child in node.children {
            self.release(child);
        }
        self.released += 1;
        debug!("headless scene: released {:?}", handle);
    }

    fn to_local(&self, handle: VisualHandle, world_point: Vec3) -> Vec3 {
        self.world_transform(handle)
            .inverse_rigid()
            .transform_point(world_point)
    }
}

// ── Tests ────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_plane_defaults() {
        let mut scene = HeadlessScene::new();
        let h = scene.create_plane_visual((0.5, 0.5), Material::Idle);
        assert!(scene.is_enabled(h));
        assert_eq!(scene.material(h), Some(Material::Idle));
        assert_eq!(scene.plane_count(), 1);
    }

    #[test]
    fn test_handles_are_unique() {
        let mut scene = HeadlessScene::new();
        let a = scene.create_plane_visual((1.0, 1.0), Material::Idle);
        let b = scene.create_plane_visual((1.0, 1.0), Material::Idle);
        assert_ne!(a, b);
    }

    #[test]
    fn test_attach_composes_world_transform() {
        let mut scene = HeadlessScene::new();
        let plane = scene.create_plane_visual((1.0, 1.0), Material::Idle);
        scene.set_transform(plane, Mat4::translation(1.0, 0.7, -2.0));
        let obj = scene.spawn_object("cube");
        scene.set_transform(obj, Mat4::translation(0.0, 0.05, 0.0));
        scene.attach(plane, obj);

        let world = scene.world_transform(obj).position();
        assert!((world.x - 1.0).abs() < 1e-6);
        assert!((world.y - 0.75).abs() < 1e-6);
        assert!((world.z + 2.0).abs() < 1e-6);
        assert_eq!(scene.node(plane).unwrap().children, vec![obj]);
    }

    #[test]
    fn test_release_removes_children() {
        let mut scene = HeadlessScene::new();
        let plane = scene.create_plane_visual((1.0, 1.0), Material::Idle);
        let obj = scene.spawn_object("cube");
        scene.attach(plane, obj);
        scene.release(plane);
        assert!(scene.nodes.is_empty());
        assert_eq!(scene.released, 2);
    }

    #[test]
    fn test_to_local_inverts_placement() {
        let mut scene = HeadlessScene::new();
        let plane = scene.create_plane_visual((1.0, 1.0), Material::Idle);
        scene.set_transform(plane, Mat4::translation(2.0, 0.0, 0.0));
        let local = scene.to_local(plane, Vec3::new(2.5, 0.0, 0.1));
        assert!((local.x - 0.5).abs() < 1e-6);
        assert!((local.z - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_missing_handle_is_noop() {
        let mut scene = HeadlessScene::new();
        scene.set_enabled(VisualHandle(99), false);
        scene.release(VisualHandle(99));
        assert_eq!(scene.released, 0);
        assert!(!scene.is_enabled(VisualHandle(99)));
    }
}
