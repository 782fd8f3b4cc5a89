//! Platform Seam
//!
//! Traits the lifecycle core calls into. Each firmware target provides one
//! implementation; host tests provide fakes. Everything behind these traits
//! is an in-process platform call, there is no wire protocol.

use core::fmt;

use crate::config::FsOptions;
use crate::types::ChipInfo;

pub mod profile;
pub mod reset_flags;

#[cfg(feature = "embedded")]
pub mod stm32;

pub use profile::{BacktraceSource, HardwareProfile};
pub use reset_flags::ResetFlags;

/// Error reported by a platform primitive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformError {
    /// The primitive is not available on this target
    NotSupported,
    /// The primitive failed with a platform error code
    Failed(i32),
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSupported => write!(f, "not supported"),
            Self::Failed(code) => write!(f, "failed (code {code})"),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for PlatformError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::NotSupported => defmt::write!(f, "not supported"),
            Self::Failed(code) => defmt::write!(f, "failed (code {})", code),
        }
    }
}

/// Monotonic millisecond clock
pub trait Clock {
    /// Milliseconds since boot
    fn now_ms(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Reboot, partition, radio and sleep primitives of the chip
pub trait SystemControl {
    /// Handle to a bootable application image
    type Partition;

    /// Restart the chip immediately. Never returns.
    fn restart(&self) -> !;

    /// Abort on an unrecoverable platform failure. Never returns.
    fn abort(&self, reason: &str) -> ! {
        panic!("fatal: {}", reason)
    }

    /// Raw last-reset code, in the `esp_reset_reason_t` numbering
    fn reset_code(&self) -> u32;

    /// 48-bit factory identifier burned into the chip (eFuse MAC or UID)
    fn factory_id(&self) -> u64;

    /// Static chip description
    fn chip_info(&self) -> ChipInfo;

    /// Microseconds since boot
    fn uptime_us(&self) -> u64;

    /// Find the factory-subtype application image with the given label
    fn find_factory_partition(&self, label: &str) -> Option<Self::Partition>;

    /// Make `partition` the image booted after the next restart
    ///
    /// # Errors
    ///
    /// Returns the platform error if the boot target could not be written.
    fn set_boot_partition(&mut self, partition: &Self::Partition) -> Result<(), PlatformError>;

    /// Shut down serial console `port`
    fn end_serial(&mut self, port: u8);

    /// Stop the Wi-Fi driver
    ///
    /// # Errors
    ///
    /// Returns the platform error if the driver refused to stop.
    fn stop_wifi(&mut self) -> Result<(), PlatformError>;

    /// Disable the Bluetooth controller and host stack
    ///
    /// # Errors
    ///
    /// Returns the platform error if the controller refused to stop.
    fn stop_bluetooth(&mut self) -> Result<(), PlatformError>;

    /// Enter deep sleep with a timer wakeup after `micros`.
    ///
    /// On success execution resumes at the reset vector, so this only
    /// returns when the chip failed to suspend.
    fn deep_sleep(&mut self, micros: u64);
}

/// Filesystem mount collaborator
pub trait Filesystem {
    /// Mount the filesystem, formatting the partition first when `format` is set
    ///
    /// # Errors
    ///
    /// Returns the platform error when the partition could not be mounted.
    fn mount(&mut self, format: bool, options: &FsOptions) -> Result<(), PlatformError>;
}

/// Filesystem stand-in for targets without one
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFilesystem;

impl Filesystem for NoFilesystem {
    fn mount(&mut self, _format: bool, _options: &FsOptions) -> Result<(), PlatformError> {
        Err(PlatformError::NotSupported)
    }
}
