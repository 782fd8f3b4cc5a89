//! Lifecycle Control Logic
//!
//! The boot/restart state machine, its single delayed-restart timer and the
//! controller that owns both.

pub mod controller;
pub mod scheduler;
pub mod state;

pub use controller::{BootReport, FsStatus, LifecycleController, LifecycleError};
pub use scheduler::{RestartScheduler, TickScheduler};
pub use state::LifecycleState;
