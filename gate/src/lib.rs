//! Precondition gate for biometric verification.
//!
//! A session walks a fixed sequence: the device must have a trustworthy
//! network connection (no VPN), then be inside the configured geofence, and
//! only then is biometric verification offered.
//!
//! - [`GateController`]: the synchronous state machine. Pure transitions,
//!   no I/O, driven entirely through its methods.
//! - [`GateRunner`]: the tokio driver that polls capabilities, runs the
//!   location timer and cancels everything when a session is abandoned.

pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod runner;
pub mod state;

pub use config::{GateConfig, OutsidePolicy};
pub use controller::{Decision, GateController};
pub use error::GateError;
pub use event::{Advisory, CapabilityKind, GateEvent};
pub use runner::GateRunner;
pub use state::{GatePhase, GateState};
