//! Access-control terminal: turns a captured probe into a door decision.
//!
//! # Architecture
//!
//! ```text
//! CaptureSource ──probe──> DecisionPipeline ──> IdentityResolver
//!                               │                 (EngineResolver | CommandResolver)
//!                               ├──> AuditLog (grants only)
//!                               ├──> StatusSink (operator messages)
//!                               └──> SerialLink ──> door controller
//! ```
//!
//! [`TerminalConfig`] selects the resolver, strategy and threshold, serial
//! port, storage paths and remote log endpoint.

pub mod audit;
pub mod capture;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod resolver;
pub mod sink;

pub use audit::AuditLog;
pub use capture::{CaptureSource, FileCapture, StaticCapture};
pub use config::{ResolverKind, StrategyKind, TerminalConfig};
pub use error::{CaptureError, PipelineError, Result, TerminalError};
pub use pipeline::{Decision, DecisionPipeline};
pub use resolver::{CommandResolver, EngineResolver, IdentityResolver};
pub use sink::{NullSink, RemoteLogSink, StatusSink};
