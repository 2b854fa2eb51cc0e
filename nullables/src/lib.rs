//! Nullable infrastructure for deterministic testing.
//!
//! Every platform dependency of the gate (connectivity, location, biometric
//! prompt) is abstracted behind a capability trait. This crate provides
//! scripted implementations that:
//! - Return pre-configured values in order
//! - Can be controlled programmatically while a session runs
//! - Never touch real hardware
//!
//! Usage: hand these to the gate runner in tests and simulations.

pub mod location;
pub mod network;
pub mod verifier;

pub use location::NullLocation;
pub use network::NullNetwork;
pub use verifier::NullVerifier;
