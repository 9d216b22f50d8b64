//! One decision per attempt: resolve, audit, signal the door.
//!
//! # Flow
//!
//! ```text
//! probe ──> IdentityResolver ──> MatchResult
//!                                   │
//!             ┌─────────────────────┴───────────────────┐
//!             │ Identity                                │ Unknown / NoProbe
//!             v                                         v
//!       AuditLog.record                           "Access denied."
//!       "Welcome, NAME! Access granted."          Frame::reject()
//!       Frame::accept(NAME)                             │
//!             └─────────────────────┬───────────────────┘
//!                                   v
//!                           SerialLink.send
//! ```
//!
//! Attempts do not overlap: a call made while another is running returns
//! [`PipelineError::Busy`] at once and touches nothing.

use crate::audit::AuditLog;
use crate::error::PipelineError;
use crate::resolver::IdentityResolver;
use crate::sink::{NullSink, StatusSink};
use facegate_core::{MatchLabel, MatchResult};
use facegate_hardware::{ConnectionState, SerialLink};
use facegate_protocol::{Frame, to_hex};
use image::RgbImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

/// What one attempt decided and did.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub result: MatchResult,

    /// Operator-facing message.
    pub message: String,

    /// Frame handed to the serial link.
    pub frame: Frame,

    /// Whether the link accepted the frame.
    pub frame_sent: bool,

    /// Whether an audit line was written.
    pub audited: bool,
}

impl Decision {
    pub fn granted(&self) -> bool {
        self.result.is_match()
    }
}

/// Releases the busy flag when the attempt ends, including by panic.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Orchestrates resolver, audit log and serial link.
///
/// Owns the terminal's only [`SerialLink`]; nothing else sends.
pub struct DecisionPipeline<R> {
    resolver: R,
    link: Mutex<SerialLink>,
    audit: AuditLog,
    sink: Box<dyn StatusSink>,
    busy: AtomicBool,
}

impl<R: IdentityResolver> DecisionPipeline<R> {
    pub fn new(resolver: R, link: SerialLink, audit: AuditLog) -> Self {
        Self {
            resolver,
            link: Mutex::new(link),
            audit,
            sink: Box::new(NullSink),
            busy: AtomicBool::new(false),
        }
    }

    /// Mirror operator messages to `sink`.
    pub fn with_sink(mut self, sink: impl StatusSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Run one attempt on `probe`, consuming it.
    ///
    /// # Errors
    /// Returns [`PipelineError::Busy`] if another attempt is in progress.
    /// Hardware and audit failures are logged and reflected in the
    /// [`Decision`], never returned.
    pub fn attempt(&self, probe: Option<RgbImage>) -> Result<Decision, PipelineError> {
        let _guard = BusyGuard::acquire(&self.busy).ok_or(PipelineError::Busy)?;

        let result = self.resolver.resolve(probe.as_ref());
        drop(probe);

        let (message, frame, audited) = match &result.label {
            MatchLabel::Identity(identity) => {
                let audited = match self.audit.record(identity) {
                    Ok(()) => true,
                    Err(e) => {
                        error!(
                            "Cannot write audit log {}: {}",
                            self.audit.path().display(),
                            e
                        );
                        false
                    }
                };
                let message = format!("Welcome, {identity}! Access granted.");
                (message, Frame::accept(identity), audited)
            }
            MatchLabel::Unknown => ("Access denied.".to_string(), Frame::reject(), false),
            MatchLabel::NoProbe => {
                warn!("Attempt without a probe image");
                (
                    "Access denied: no image captured.".to_string(),
                    Frame::reject(),
                    false,
                )
            }
        };

        info!("{} [{}]", message, result);
        self.sink.publish(&message);

        let bytes = frame.to_bytes();
        debug!("Sending frame: {}", to_hex(&bytes));
        let frame_sent = self.link().send(&bytes);

        Ok(Decision {
            result,
            message,
            frame,
            frame_sent,
            audited,
        })
    }

    /// Whether an attempt is running right now.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// (Re)open the serial link.
    pub fn open_link(&self, port: &str, baud: u32) -> ConnectionState {
        self.link().open(port, baud)
    }

    pub fn link_state(&self) -> ConnectionState {
        self.link().state()
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Close the serial link. Safe whether or not it ever opened.
    pub fn shutdown(&self) {
        info!("Shutting down decision pipeline");
        self.link().close();
    }

    fn link(&self) -> MutexGuard<'_, SerialLink> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R> std::fmt::Debug for DecisionPipeline<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionPipeline")
            .field("audit", &self.audit)
            .field("busy", &self.busy)
            .finish_non_exhaustive()
    }
}
