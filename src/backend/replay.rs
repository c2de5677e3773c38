//! Deterministic driver: pulls events from an `InputProvider` one at a
//! time and polls gaze at the configured cadence of a [`Clock`].
//!
//! With `ManualClock` a whole session runs instantly and identically on
//! every run; with `SystemClock` it plays back in real time.

use tracing::info;

use super::simulated::{SimulatedDetector, SimulatedHeadset};
use super::{dispatch_input, SimulationConfig};
use crate::capability::{enable_detection, Authorization, PoseProvider};
use crate::clock::{Clock, SystemClock, TickSchedule};
use crate::input_source::{InputEvent, InputProvider, ScriptedInputProvider};
use crate::spatial::commit::Placement;
use crate::spatial::visual::{HeadlessScene, VisualBackend};
use crate::spatial::{PlacementConfig, PlacementSession};

/// What a replay did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Events pulled from the provider, waits included.
    pub events: usize,
    pub gaze_ticks: u64,
    pub placement: Option<Placement>,
}

/// Drain `provider` into `session`.
///
/// Gaze polls that come due while a `Wait` elapses run after it, using
/// the headset pose at that moment. Polling stops once the session is
/// confirmed; remaining events are still delivered (and are inert).
pub fn replay<P, C, V>(
    provider: &mut P,
    session: &mut PlacementSession<V>,
    headset: &mut SimulatedHeadset,
    clock: &C,
) -> ReplaySummary
where
    P: InputProvider + ?Sized,
    C: Clock + ?Sized,
    V: VisualBackend,
{
    let mut schedule = TickSchedule::new(clock.now(), session.config.gaze_interval);
    let mut summary = ReplaySummary::default();

    while let Some(event) = provider.next_event() {
        summary.events += 1;
        if let Some(duration) = dispatch_input(session, headset, event) {
            clock.sleep(duration);
        }

        for _ in 0..schedule.due(clock.now()) {
            if session.is_confirmed() {
                break;
            }
            session.gaze_tick(headset.device_pose());
            summary.gaze_ticks += 1;
        }
    }

    summary.placement = session.placement();
    summary
}

/// Replay `script` on the system clock against a headless scene.
///
/// Anchor events are dropped when the simulated detector cannot start.
pub fn run(
    config: PlacementConfig,
    script: Vec<InputEvent>,
    simulation: SimulationConfig,
) -> ReplaySummary {
    let mut detector = SimulatedDetector::new(Vec::new());
    detector.supported = !simulation.unsupported;
    if simulation.denied {
        detector.authorization = Authorization::Denied;
    }
    let (sink, _stream) = calloop::channel::channel();
    let detecting = enable_detection(&mut detector, sink);
    detector.join();

    let script: Vec<InputEvent> = script
        .into_iter()
        .filter(|e| detecting || !matches!(e, InputEvent::Anchor(_)))
        .collect();

    info!("replaying {} scripted event(s)", script.len());
    let mut provider = ScriptedInputProvider::new(script);
    let mut session = PlacementSession::new(config, HeadlessScene::new());
    let mut headset = SimulatedHeadset::new();
    let summary = replay(&mut provider, &mut session, &mut headset, &SystemClock);
    info!("final state: {}", session.state_sexp());
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::spatial::config::SurfaceClass;
    use crate::spatial::pose::{Mat4, Vec3};
    use crate::spatial::registry::{AnchorEvent, ItemId};

    fn session() -> PlacementSession<HeadlessScene> {
        PlacementSession::new(PlacementConfig::default(), HeadlessScene::new())
    }

    #[test]
    fn test_ticks_follow_waits() {
        let clock = ManualClock::new();
        let mut s = session();
        let mut headset = SimulatedHeadset::new();
        let mut provider = ScriptedInputProvider::new(vec![
            InputEvent::wait_ms(100),
            InputEvent::wait_ms(32),
        ]);
        let summary = replay(&mut provider, &mut s, &mut headset, &clock);
        assert_eq!(summary.events, 2);
        // 132ms at 33ms cadence.
        assert_eq!(summary.gaze_ticks, 4);
        assert!(summary.placement.is_none());
    }

    #[test]
    fn test_select_then_confirm() {
        let clock = ManualClock::new();
        let mut s = session();
        let mut headset = SimulatedHeadset::new();
        let mut provider = ScriptedInputProvider::new(vec![
            InputEvent::Anchor(AnchorEvent::added(
                7,
                Mat4::translation(0.0, 0.7, -1.0),
                SurfaceClass::Table,
            )),
            InputEvent::Look {
                from: Vec3::new(0.0, 1.5, 0.0),
                at: Vec3::new(0.0, 0.7, -1.0),
            },
            InputEvent::wait_ms(50),
            InputEvent::Confirm,
            InputEvent::wait_ms(100),
        ]);
        let summary = replay(&mut provider, &mut s, &mut headset, &clock);
        let placement = summary.placement.unwrap();
        assert_eq!(placement.item, ItemId(1));
        // One tick before the confirm; none after.
        assert_eq!(summary.gaze_ticks, 1);
    }

    #[test]
    fn test_confirm_without_gaze_time_fails() {
        let clock = ManualClock::new();
        let mut s = session();
        let mut headset = SimulatedHeadset::new();
        let mut provider = ScriptedInputProvider::new(vec![
            InputEvent::Anchor(AnchorEvent::added(
                1,
                Mat4::translation(0.0, 0.7, -1.0),
                SurfaceClass::Table,
            )),
            InputEvent::Confirm,
        ]);
        let summary = replay(&mut provider, &mut s, &mut headset, &clock);
        assert_eq!(summary.gaze_ticks, 0);
        assert!(summary.placement.is_none());
        assert!(!s.is_confirmed());
    }
}
