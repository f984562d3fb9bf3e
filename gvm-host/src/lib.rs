//! Host-local command plumbing for the maintenance sequencer.
//!
//! Everything here shells out: bounded subprocess execution, `systemctl`
//! service control and command lookup.

pub mod services;
pub mod types;

pub use types::{CommandError, CommandOutput};
