//! Placement session: the single owner of registry, active selection
//! and gesture state. Every producer (detector, gaze poll, gestures,
//! confirmation) goes through `&mut PlacementSession`, so writes to an
//! item are serialized by construction.

use tracing::{debug, info, warn};

use super::commit::{commit_placement, CommitError, Placement};
use super::config::PlacementConfig;
use super::gaze_select::{GazeSelector, SelectionChange};
use super::gesture::{DragGesture, GestureOutcome, InteractionController, RotateGesture};
use super::pose::{project_xz, Mat4};
use super::registry::{AnchorEvent, DetectionOutcome, ItemId, SurfaceRegistry};
use super::visual::{VisualBackend, VisualHandle};

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Detecting, selecting and adjusting surfaces.
    Scanning,
    /// Placement committed; all inputs are inert.
    Confirmed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scanning => "scanning",
            Self::Confirmed => "confirmed",
        }
    }
}

/// Owned state for one placement flow.
pub struct PlacementSession<V: VisualBackend> {
    pub config: PlacementConfig,
    pub registry: SurfaceRegistry,
    pub visuals: V,
    gaze: GazeSelector,
    interaction: InteractionController,
    phase: Phase,
    placement: Option<Placement>,
}

impl<V: VisualBackend> PlacementSession<V> {
    pub fn new(config: PlacementConfig, visuals: V) -> Self {
        info!(
            "placement session: target {} merge<{:.2} gaze>={:.2}",
            config.target_class.as_str(),
            config.merge_threshold,
            config.gaze_threshold
        );
        Self {
            registry: SurfaceRegistry::new(&config),
            gaze: GazeSelector::new(config.gaze_threshold, config.hide_unfocused),
            interaction: InteractionController::new(config.nudge_clamp, config.nudge_step),
            config,
            visuals,
            phase: Phase::Scanning,
            placement: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_confirmed(&self) -> bool {
        self.phase == Phase::Confirmed
    }

    pub fn active(&self) -> Option<ItemId> {
        self.gaze.active()
    }

    /// Visual of the active item (what a user would be touching).
    pub fn active_visual(&self) -> Option<VisualHandle> {
        self.registry.get(self.active()?).map(|i| i.visual)
    }

    /// Whether the confirmation control should be enabled.
    pub fn can_confirm(&self) -> bool {
        !self.is_confirmed() && self.active().is_some()
    }

    pub fn placement(&self) -> Option<Placement> {
        self.placement
    }

    pub fn gaze(&self) -> &GazeSelector {
        &self.gaze
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    /// Feed one detection event. `None` once confirmed.
    pub fn handle_anchor(&mut self, event: &AnchorEvent) -> Option<DetectionOutcome> {
        if self.is_confirmed() {
            return None;
        }
        let outcome = self.registry.apply(event, &mut self.visuals);
        if let DetectionOutcome::Merged {
            orphan: Some(orphan),
            ..
        } = outcome
        {
            self.gaze.forget(orphan);
            self.interaction.forget(orphan);
        }
        Some(outcome)
    }

    /// Run one gaze poll with the current device pose.
    pub fn gaze_tick(&mut self, device: Option<Mat4>) -> Option<SelectionChange> {
        if self.is_confirmed() {
            return None;
        }
        self.gaze.tick(device, &self.registry, &mut self.visuals)
    }

    pub fn handle_rotate(&mut self, gesture: &RotateGesture) -> GestureOutcome {
        if self.is_confirmed() {
            return GestureOutcome::Ignored;
        }
        let active = self.gaze.active();
        self.interaction
            .on_rotate(gesture, active, &mut self.registry, &mut self.visuals)
    }

    pub fn handle_drag(&mut self, gesture: &DragGesture) -> GestureOutcome {
        if self.is_confirmed() {
            return GestureOutcome::Ignored;
        }
        let active = self.gaze.active();
        self.interaction
            .on_drag(gesture, active, &mut self.registry, &mut self.visuals)
    }

    /// Commit the placement onto the active item. Terminal on success.
    pub fn confirm(&mut self) -> Result<Placement, CommitError> {
        if self.is_confirmed() {
            warn!("confirm ignored: already confirmed");
            return Err(CommitError::AlreadyConfirmed);
        }
        let Some(item) = self.gaze.active() else {
            debug!("confirm ignored: nothing selected");
            return Err(CommitError::NoActiveSelection);
        };

        let placement = commit_placement(
            item,
            &self.registry,
            &mut self.visuals,
            &self.config.placed_object,
            self.config.placed_offset,
        )?;
        self.phase = Phase::Confirmed;
        self.interaction.reset();
        self.placement = Some(placement);
        Ok(placement)
    }

    /// Session snapshot as an s-expression.
    pub fn state_sexp(&self) -> String {
        let mut items = String::from("(");
        for id in self.registry.ids() {
            if let Some(item) = self.registry.get(id) {
                let (x, z) = project_xz(&item.transform);
                items.push_str(&format!(
                    "(:id {} :x {:.2} :z {:.2} :locked {})",
                    id.0,
                    x,
                    z,
                    if item.locked { "t" } else { "nil" },
                ));
            }
        }
        items.push(')');

        let active = self
            .active()
            .map(|id| id.0.to_string())
            .unwrap_or_else(|| "nil".to_string());

        format!(
            "(:phase :{} :active {} :item-count {} :items {})",
            self.phase.as_str(),
            active,
            self.registry.len(),
            items
        )
    }
}

// ── Tests ────────────────────────────────────────────────────
