//! Placement commit, the terminal step of a session: hide every
//! candidate and put the object on the chosen surface.

use thiserror::Error;
use tracing::info;

use super::pose::Mat4;
use super::registry::{ItemId, SurfaceRegistry};
use super::visual::{VisualBackend, VisualHandle};

/// Why a confirmation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommitError {
    #[error("no surface is selected")]
    NoActiveSelection,
    #[error("placement was already confirmed")]
    AlreadyConfirmed,
}

/// The object placed by a successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub item: ItemId,
    pub object: VisualHandle,
}

/// Hide all candidates and attach `object_name` above `item`.
///
/// Callers guarantee this runs once per session.
pub fn commit_placement<V: VisualBackend + ?Sized>(
    item: ItemId,
    registry: &SurfaceRegistry,
    visuals: &mut V,
    object_name: &str,
    offset: f32,
) -> Result<Placement, CommitError> {
    let surface = registry.get(item).ok_or(CommitError::NoActiveSelection)?;

    for candidate in registry.items() {
        visuals.set_enabled(candidate.visual, false);
    }

    let object = visuals.spawn_object(object_name);
    visuals.set_transform(object, Mat4::translation(0.0, offset, 0.0));
    visuals.attach(surface.visual, object);

    info!(
        "placement committed: '{}' on item {} (visual {})",
        object_name, item.0, object.0
    );
    Ok(Placement { item, object })
}
