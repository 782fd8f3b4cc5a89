//! Firmware Lifecycle Library
//!
//! Boot accounting, reboot classification, memory health, crash capture and
//! controlled restart / reset / deep-sleep for microcontroller firmware.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    APPLICATION / REPORTING                   │
//! │        firmware tasks  │  remote commands  │  JSON export    │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   LIFECYCLE CONTROLLER                       │
//! │  initialize │ restart │ reset │ restart_factory │ deep_sleep │
//! ├───────────────┬───────────────┬───────────────┬─────────────┤
//! │ Counter Store │ Memory Health │ Reboot Reason │ Crash Dump  │
//! ├───────────────┴───────────────┴───────────────┴─────────────┤
//! │                      PLATFORM SEAM                           │
//! │  DurableStore │ Filesystem │ SystemControl │ HeapStats │ ... │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Single owner**: one `LifecycleController` per process, no hidden statics
//! - **Diverging where irrevocable**: restart, abort and sleep return `!`
//! - **Best effort diagnostics**: absent or partial crash data is a value, not an error
//! - **Capabilities, not `#[cfg]`**: hardware differences live in a `HardwareProfile`

#![cfg_attr(feature = "embedded", no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export dependencies needed by applications (only in embedded mode)
#[cfg(feature = "embedded")]
pub use embassy_executor;
#[cfg(feature = "embedded")]
pub use embassy_stm32;
#[cfg(feature = "embedded")]
pub use embassy_time;

pub use embedded_storage;

// Log through defmt on target, through the `log` facade on host.
#[cfg(feature = "embedded")]
pub(crate) use defmt as logger;
#[cfg(all(feature = "std", not(feature = "embedded")))]
pub(crate) use log as logger;

#[cfg(not(any(feature = "std", feature = "embedded")))]
pub(crate) mod logger {
    macro_rules! discard {
        ( $( $x:expr ),* ) => {{
            $( let _ = &$x; )*
        }};
    }
    pub(crate) use discard as debug;
    pub(crate) use discard as error;
    pub(crate) use discard as info;
    pub(crate) use discard as warn;
}

/// Platform Seam
///
/// Collaborator traits for restart, sleep, partitions and the filesystem,
/// plus the per-family hardware profiles.
pub mod platform;

/// Persisted Counter Store
///
/// Boot counter kept in the durable key/value store.
pub mod store;

/// Memory Health Reporter
pub mod memory;

/// Reboot Reason Classifier
pub mod reboot;

/// Crash Summary Extractor
///
/// Decodes the crash record retained from the previous abnormal reset.
pub mod crash;

/// Lifecycle Controller
///
/// Startup, restart, reset and deep-sleep state machine.
pub mod lifecycle;

/// Export surface consumed by the reporting layer
pub mod report;

/// Shared types used across modules
pub mod types;

/// System configuration and constants
pub mod config;

/// Embassy runtime shell
///
/// Drives the delayed-restart timer on target.
#[cfg(feature = "embedded")]
pub mod runtime;

/// Prelude module for common imports
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::config::*;
    pub use crate::crash::{CrashExtractor, CrashSource, CrashSummary};
    pub use crate::lifecycle::{
        BootReport, FsStatus, LifecycleController, LifecycleError, LifecycleState,
        RestartScheduler, TickScheduler,
    };
    pub use crate::memory::{HeapStats, MemoryReporter, MemorySnapshot};
    pub use crate::platform::{Clock, Filesystem, HardwareProfile, PlatformError, SystemControl};
    pub use crate::reboot::RebootReason;
    pub use crate::report::SystemReport;
    pub use crate::store::{CounterStore, DurableStore, StoreError};
    pub use crate::types::*;

    // Embassy
    #[cfg(feature = "embedded")]
    pub use embassy_time::{Duration, Instant, Timer};

    // Logging
    #[cfg(feature = "embedded")]
    pub use defmt::{debug, error, info, trace, warn};
}
