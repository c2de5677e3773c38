//! Sensing capabilities the placement core consumes: the surface
//! detector (asynchronous anchor stream) and the device pose query.
//!
//! Detector setup never fails loudly. An unsupported device, a denied
//! authorization or a provider that will not start all leave the feature
//! disabled; each case is logged distinctly so it can be told apart from
//! "nothing detected yet".

use calloop::channel::Sender;
use thiserror::Error;
use tracing::{info, warn};

use crate::spatial::pose::Mat4;
use crate::spatial::registry::AnchorEvent;

/// Result of a world-sensing authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Allowed,
    Denied,
    NotDetermined,
}

impl Authorization {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Denied => "denied",
            Self::NotDetermined => "not-determined",
        }
    }
}

/// Why surface detection is not running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("surface detection is not supported on this device")]
    Unsupported,
    #[error("world sensing authorization {0}")]
    PermissionDenied(&'static str),
    #[error("surface detection failed to start: {0}")]
    StartFailed(String),
}

/// Source of plane anchor events.
pub trait SurfaceDetector {
    fn is_supported(&self) -> bool;

    /// Ask for world-sensing access. May block until the user answers.
    fn request_authorization(&mut self) -> Authorization;

    /// Begin streaming anchor events into `sink`.
    ///
    /// The detector must stop producing once `sink` reports the channel
    /// closed.
    fn start(&mut self, sink: Sender<AnchorEvent>) -> Result<(), CapabilityError>;
}

/// Synchronous device pose query.
pub trait PoseProvider {
    /// Current device pose, or `None` while tracking is unavailable.
    fn device_pose(&self) -> Option<Mat4>;
}

/// Check support and authorization, then start the detector.
pub fn start_detection<D: SurfaceDetector + ?Sized>(
    detector: &mut D,
    sink: Sender<AnchorEvent>,
) -> Result<(), CapabilityError> {
    if !detector.is_supported() {
        return Err(CapabilityError::Unsupported);
    }
    match detector.request_authorization() {
        Authorization::Allowed => {}
        other => return Err(CapabilityError::PermissionDenied(other.as_str())),
    }
    detector.start(sink)?;
    info!("surface detection started");
    Ok(())
}

/// `start_detection`, degrading every failure to "feature disabled".
///
/// Returns whether detection is running.
pub fn enable_detection<D: SurfaceDetector + ?Sized>(
    detector: &mut D,
    sink: Sender<AnchorEvent>,
) -> bool {
    match start_detection(detector, sink) {
        Ok(()) => true,
        Err(CapabilityError::Unsupported) => {
            warn!("surface detection unavailable: device does not support plane detection");
            false
        }
        Err(e @ CapabilityError::PermissionDenied(_)) => {
            warn!("surface detection disabled: {}", e);
            false
        }
        Err(e @ CapabilityError::StartFailed(_)) => {
            warn!("surface detection disabled: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::config::SurfaceClass;

    struct StubDetector {
        supported: bool,
        auth: Authorization,
        fail_start: bool,
        started: bool,
        asked: bool,
    }

    impl StubDetector {
        fn new() -> Self {
            Self {
                supported: true,
                auth: Authorization::Allowed,
                fail_start: false,
                started: false,
                asked: false,
            }
        }
    }

    impl SurfaceDetector for StubDetector {
        fn is_supported(&self) -> bool {
            self.supported
        }

        fn request_authorization(&mut self) -> Authorization {
            self.asked = true;
            self.auth
        }

        fn start(&mut self, sink: Sender<AnchorEvent>) -> Result<(), CapabilityError> {
            if self.fail_start {
                return Err(CapabilityError::StartFailed("provider not running".into()));
            }
            self.started = true;
            let _ = sink.send(AnchorEvent::added(1, Mat4::IDENTITY, SurfaceClass::Table));
            Ok(())
        }
    }

    #[test]
    fn test_start_ok() {
        let (tx, _rx) = calloop::channel::channel();
        let mut d = StubDetector::new();
        assert!(enable_detection(&mut d, tx));
        assert!(d.started);
    }

    #[test]
    fn test_unsupported_skips_authorization() {
        let (tx, _rx) = calloop::channel::channel();
        let mut d = StubDetector::new();
        d.supported = false;
        assert_eq!(start_detection(&mut d, tx), Err(CapabilityError::Unsupported));
        assert!(!d.asked);
        assert!(!d.started);
    }

    #[test]
    fn test_denied() {
        let (tx, _rx) = calloop::channel::channel();
        let mut d = StubDetector::new();
        d.auth = Authorization::Denied;
        assert_eq!(
            start_detection(&mut d, tx),
            Err(CapabilityError::PermissionDenied("denied"))
        );
        assert!(!d.started);
    }

    #[test]
    fn test_start_failure_disables() {
        let (tx, _rx) = calloop::channel::channel();
        let mut d = StubDetector::new();
        d.fail_start = true;
        assert!(!enable_detection(&mut d, tx));
    }
}
