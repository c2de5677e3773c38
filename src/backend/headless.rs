//! Headless backend: runs the placement session on a calloop event loop.
//!
//! The detector and the scripted user each run on their own thread and
//! feed channels; gaze is a repeating timer. The loop thread owns the
//! session, so every mutation happens there one event at a time.

use std::thread;
use std::time::Duration;

use calloop::channel::{self, Event as ChannelEvent};
use calloop::signals::{Signal, Signals};
use calloop::timer::{TimeoutAction, Timer};
use calloop::EventLoop;
use tracing::{debug, info};

use super::simulated::{split_anchors, SimulatedDetector, SimulatedHeadset};
use super::{dispatch_input, SimulationConfig};
use crate::capability::{enable_detection, Authorization, PoseProvider};
use crate::input_source::InputEvent;
use crate::spatial::commit::Placement;
use crate::spatial::registry::AnchorEvent;
use crate::spatial::visual::HeadlessScene;
use crate::spatial::{PlacementConfig, PlacementSession};

/// Interval between status log lines.
const STATUS_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound on a single dispatch wait.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// State owned by the headless event loop.
pub struct HeadlessState {
    pub session: PlacementSession<HeadlessScene>,
    pub headset: SimulatedHeadset,
    pub running: bool,
}

/// Run `script` in real time. Anchor events in the script are delivered by
/// a simulated detector thread; everything else by a user thread.
///
/// Returns the placement, if the session was confirmed before the loop
/// stopped (signal, exit timer, or confirmation).
pub fn run(
    config: PlacementConfig,
    script: Vec<InputEvent>,
    exit_after: Option<u64>,
    simulation: SimulationConfig,
) -> anyhow::Result<Option<Placement>> {
    if config.gaze_interval.is_zero() {
        anyhow::bail!("gaze interval must be non-zero");
    }
    let mut event_loop = EventLoop::<HeadlessState>::try_new()?;
    let handle = event_loop.handle();

    let gaze_interval = config.gaze_interval;
    let mut state = HeadlessState {
        session: PlacementSession::new(config, HeadlessScene::new()),
        headset: SimulatedHeadset::new(),
        running: true,
    };

    let (anchors, user_events) = split_anchors(script);

    // Detection stream
    let (anchor_tx, anchor_rx) = channel::channel::<AnchorEvent>();
    let detection = handle
        .insert_source(anchor_rx, |event, _, state: &mut HeadlessState| match event {
            ChannelEvent::Msg(anchor) => {
                let event = InputEvent::Anchor(anchor);
                dispatch_input(&mut state.session, &mut state.headset, event);
            }
            ChannelEvent::Closed => debug!("detector stream closed"),
        })
        .map_err(|e| anyhow::anyhow!("failed to register detection stream: {}", e.error))?;

    let mut detector = SimulatedDetector::new(anchors);
    detector.supported = !simulation.unsupported;
    if simulation.denied {
        detector.authorization = Authorization::Denied;
    }
    let mut detection = if enable_detection(&mut detector, anchor_tx) {
        Some(detection)
    } else {
        info!("continuing without surface detection");
        handle.remove(detection);
        None
    };

    // User input stream
    let (input_tx, input_rx) = channel::channel::<InputEvent>();
    handle
        .insert_source(input_rx, |event, _, state: &mut HeadlessState| match event {
            ChannelEvent::Msg(input) => {
                dispatch_input(&mut state.session, &mut state.headset, input);
            }
            ChannelEvent::Closed => debug!("user script finished"),
        })
        .map_err(|e| anyhow::anyhow!("failed to register input stream: {}", e.error))?;

    let user = thread::Builder::new()
        .name("scripted-user".into())
        .spawn(move || {
            for event in user_events {
                match event {
                    InputEvent::Wait { duration } => thread::sleep(duration),
                    other => {
                        if input_tx.send(other).is_err() {
                            break;
                        }
                    }
                }
            }
        })?;

    // Gaze poll; stops rescheduling once confirmed.
    handle
        .insert_source(
            Timer::from_duration(gaze_interval),
            move |_, _, state: &mut HeadlessState| {
                if state.session.is_confirmed() {
                    debug!("gaze poll stopped");
                    return TimeoutAction::Drop;
                }
                let pose = state.headset.device_pose();
                state.session.gaze_tick(pose);
                TimeoutAction::ToDuration(gaze_interval)
            },
        )
        .map_err(|e| anyhow::anyhow!("failed to register gaze timer: {}", e.error))?;

    // Signal handling: SIGTERM and SIGINT for graceful shutdown
    let signals = Signals::new(&[Signal::SIGTERM, Signal::SIGINT])
        .map_err(|e| anyhow::anyhow!("failed to create signal source: {}", e))?;
    handle
        .insert_source(signals, |event, _, state: &mut HeadlessState| {
            info!("Received signal {:?}, initiating graceful shutdown", event.signal());
            state.running = false;
        })
        .map_err(|e| anyhow::anyhow!("failed to register signal handler: {}", e.error))?;

    // Exit timer for CI
    if let Some(seconds) = exit_after {
        info!("Will exit after {} seconds", seconds);
        handle
            .insert_source(
                Timer::from_duration(Duration::from_secs(seconds)),
                |_, _, state: &mut HeadlessState| {
                    info!("Headless exit timer fired");
                    state.running = false;
                    TimeoutAction::Drop
                },
            )
            .map_err(|e| anyhow::anyhow!("failed to register exit timer: {}", e.error))?;
    }

    // Periodic status logging
    handle
        .insert_source(
            Timer::from_duration(STATUS_INTERVAL),
            |_, _, state: &mut HeadlessState| {
                info!("Headless status: {}", state.session.state_sexp());
                TimeoutAction::ToDuration(STATUS_INTERVAL)
            },
        )
        .map_err(|e| anyhow::anyhow!("failed to register status timer: {}", e.error))?;

    info!(
        "Headless backend initialized (gaze every {}ms), entering event loop",
        gaze_interval.as_millis()
    );

    while state.running {
        event_loop.dispatch(Some(POLL_INTERVAL), &mut state)?;

        if state.session.is_confirmed() {
            // Dropping the receiver ends the detector thread on its next send.
            if let Some(token) = detection.take() {
                handle.remove(token);
                info!("detection stream cancelled");
            }
            state.running = false;
        }
    }

    // Drop every source so the producers see their channels closed.
    drop(handle);
    drop(event_loop);
    if let Some(delivered) = detector.join() {
        debug!("detector delivered {} event(s)", delivered);
    }
    if user.join().is_err() {
        debug!("scripted user thread panicked");
    }

    info!("Headless backend shutting down: {}", state.session.state_sexp());
    Ok(state.session.placement())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::config::SurfaceClass;
    use crate::spatial::pose::{Mat4, Vec3};
    use crate::spatial::registry::ItemId;

    fn fast_config() -> PlacementConfig {
        PlacementConfig {
            gaze_interval: Duration::from_millis(10),
            ..PlacementConfig::default()
        }
    }

    fn select_and_confirm() -> Vec<InputEvent> {
        vec![
            InputEvent::Anchor(AnchorEvent::added(
                1,
                Mat4::translation(0.0, 0.7, -1.0),
                SurfaceClass::Table,
            )),
            InputEvent::Look {
                from: Vec3::new(0.0, 1.5, 0.0),
                at: Vec3::new(0.0, 0.7, -1.0),
            },
            InputEvent::wait_ms(300),
            InputEvent::Confirm,
        ]
    }

    #[test]
    fn test_headless_confirms_and_stops() {
        let placement = run(
            fast_config(),
            select_and_confirm(),
            Some(10),
            SimulationConfig::default(),
        )
        .unwrap();
        assert_eq!(placement.map(|p| p.item), Some(ItemId(1)));
    }

    #[test]
    fn test_headless_denied_runs_without_surfaces() {
        let placement = run(
            fast_config(),
            select_and_confirm(),
            Some(1),
            SimulationConfig {
                unsupported: false,
                denied: true,
            },
        )
        .unwrap();
        assert!(placement.is_none());
    }

    #[test]
    fn test_headless_rejects_zero_gaze_interval() {
        let config = PlacementConfig {
            gaze_interval: Duration::ZERO,
            ..PlacementConfig::default()
        };
        let result = run(config, Vec::new(), Some(1), SimulationConfig::default());
        assert!(result.is_err());
    }
}
