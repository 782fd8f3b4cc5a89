//! Lifecycle Controller
//!
//! Single owner of the boot counter, the delayed-restart timer and the
//! platform primitives. Built once at startup and passed to whoever needs
//! to restart, reset or put the device to sleep.

use core::cell::OnceCell;
use core::fmt;

use crate::config::{FsOptions, InitOptions, KEY_BOOTS};
use crate::lifecycle::scheduler::RestartScheduler;
use crate::lifecycle::state::LifecycleState;
use crate::logger::{debug, error, info, warn};
use crate::platform::{Filesystem, HardwareProfile, SystemControl};
use crate::reboot::{classify, RebootReason};
use crate::store::{CounterStore, DurableStore};
use crate::types::{ChipId, ChipInfo};

/// Recoverable lifecycle error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleError {
    /// `initialize` already ran in this boot
    AlreadyInitialized,
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInitialized => write!(f, "already initialized"),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for LifecycleError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::AlreadyInitialized => defmt::write!(f, "already initialized"),
        }
    }
}

/// Outcome of the filesystem step of `initialize`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FsStatus {
    /// Mounting was not requested
    #[default]
    Skipped,
    /// Mounted as-is
    Mounted,
    /// Mounted after a destructive reformat
    Reformatted,
    /// Mount and reformat both failed, running without filesystem
    Degraded,
}

impl FsStatus {
    /// Check if the filesystem can be used
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Mounted | Self::Reformatted)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for FsStatus {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Skipped => defmt::write!(f, "skipped"),
            Self::Mounted => defmt::write!(f, "mounted"),
            Self::Reformatted => defmt::write!(f, "reformatted"),
            Self::Degraded => defmt::write!(f, "degraded"),
        }
    }
}

/// What `initialize` found and did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BootReport {
    /// Boot counter after this boot was counted
    pub boot_count: u32,
    /// Filesystem outcome
    pub filesystem: FsStatus,
    /// Why the chip last reset
    pub reboot_reason: RebootReason,
}

/// Boot/restart lifecycle state machine
pub struct LifecycleController<P, S, F, T> {
    system: P,
    counters: CounterStore<S>,
    filesystem: F,
    scheduler: T,
    profile: HardwareProfile,
    state: LifecycleState,
    boot_count: u32,
    filesystem_status: FsStatus,
    chip_id: OnceCell<ChipId>,
    reboot_reason: OnceCell<RebootReason>,
}

impl<P, S, F, T> LifecycleController<P, S, F, T>
where
    P: SystemControl,
    S: DurableStore,
    F: Filesystem,
    T: RestartScheduler,
{
    /// Create an uninitialized controller
    #[must_use]
    pub fn new(system: P, store: S, filesystem: F, scheduler: T, profile: HardwareProfile) -> Self {
        Self {
            system,
            counters: CounterStore::new(store),
            filesystem,
            scheduler,
            profile,
            state: LifecycleState::Uninitialized,
            boot_count: 0,
            filesystem_status: FsStatus::Skipped,
            chip_id: OnceCell::new(),
            reboot_reason: OnceCell::new(),
        }
    }

    /// Initialize the durable store, count this boot and mount the filesystem
    ///
    /// An unusable durable store aborts the chip. A filesystem that neither
    /// mounts nor reformats leaves the controller running without one. After
    /// a successful reformat the chip restarts when
    /// `FsOptions::restart_after_format` is set.
    ///
    /// # Errors
    ///
    /// `LifecycleError::AlreadyInitialized` on a second call; the boot
    /// counter is not touched.
    pub fn initialize(&mut self, options: &InitOptions) -> Result<BootReport, LifecycleError> {
        if self.state.is_initialized() {
            return Err(LifecycleError::AlreadyInitialized);
        }

        info!("Initializing durable store...");
        if let Err(e) = self.counters.init_store() {
            error!("Durable store initialization failed: {}", e);
            self.system.abort("durable store initialization failed");
        }

        self.boot_count = self.counters.increment_and_get(KEY_BOOTS);
        info!("Booted {} times", self.boot_count);
        self.state = LifecycleState::Running;

        self.filesystem_status = if options.mount_filesystem {
            self.mount_filesystem(&options.fs)
        } else {
            FsStatus::Skipped
        };

        Ok(BootReport {
            boot_count: self.boot_count,
            filesystem: self.filesystem_status,
            reboot_reason: self.last_reboot_reason(),
        })
    }

    fn mount_filesystem(&mut self, options: &FsOptions) -> FsStatus {
        info!("Initializing file system...");
        if self.filesystem.mount(false, options).is_ok() {
            debug!("File system initialized");
            return FsStatus::Mounted;
        }

        warn!("File system initialization failed. Trying to format...");
        match self.filesystem.mount(true, options) {
            Ok(()) if options.restart_after_format => {
                warn!("Successfully formatted and initialized. Rebooting...");
                self.restart_now()
            }
            Ok(()) => {
                warn!("Successfully formatted and initialized");
                FsStatus::Reformatted
            }
            Err(e) => {
                error!("Failed to format and initialize file system: {}", e);
                FsStatus::Degraded
            }
        }
    }

    /// Restart after `delay_ms`, or right away when it is 0
    ///
    /// Any previously armed restart is cancelled first; the last request
    /// wins. With a zero delay this call does not return.
    pub fn restart(&mut self, delay_ms: u32) {
        self.scheduler.cancel();
        if delay_ms == 0 {
            self.restart_now();
        }

        warn!("Restart in {} ms...", delay_ms);
        self.scheduler.arm(delay_ms);
        self.state = LifecycleState::RestartPending;
    }

    /// Restart the chip immediately
    pub fn restart_now(&self) -> ! {
        warn!("Restart!");
        self.system.restart()
    }

    /// Wipe the durable store, then restart after `delay_ms`
    ///
    /// Clears the boot counter together with every other key in the store.
    /// Not undoable. An erase failure aborts the chip.
    pub fn reset(&mut self, delay_ms: u32) {
        warn!("Reset!");
        self.scheduler.cancel();
        self.state = LifecycleState::ResettingDurableStore;

        if let Err(e) = self.counters.wipe() {
            error!("Durable store erase failed: {}", e);
            self.system.abort("durable store erase failed");
        }
        self.boot_count = 0;

        self.restart(delay_ms);
    }

    /// Boot the factory image `label` after `delay_ms`
    ///
    /// Returns `false` and leaves the boot target untouched when no such
    /// image exists or it cannot be selected. With a zero delay a successful
    /// call does not return.
    pub fn restart_factory(&mut self, label: &str, delay_ms: u32) -> bool {
        let Some(partition) = self.system.find_factory_partition(label) else {
            error!("Partition not found: {}", label);
            return false;
        };

        warn!("Set boot partition to {}", label);
        if let Err(e) = self.system.set_boot_partition(&partition) {
            error!("Unable to set boot partition {}: {}", label, e);
            return false;
        }

        self.restart(delay_ms);
        true
    }

    /// Shut down I/O and enter deep sleep for `delay_us`
    ///
    /// Consoles are closed first, then the radios; Wi-Fi is always stopped
    /// before the sleep primitive runs. Waking up goes through the normal
    /// boot path. If the chip fails to suspend it is restarted instead.
    pub fn deep_sleep(&mut self, delay_us: u64) -> ! {
        info!("Deep Sleep for {} us!", delay_us);
        self.state = LifecycleState::ShuttingDownForSleep;
        self.scheduler.cancel();

        for port in (0..self.profile.uart_count).rev() {
            self.system.end_serial(port);
        }

        if self.profile.has_wifi {
            if let Err(e) = self.system.stop_wifi() {
                warn!("Unable to stop Wi-Fi: {}", e);
            }
        }

        if self.profile.has_bluetooth {
            if let Err(e) = self.system.stop_bluetooth() {
                warn!("Unable to stop Bluetooth: {}", e);
            }
        }

        self.system.deep_sleep(delay_us);

        error!("Deep sleep entry failed, restarting");
        self.system.restart()
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Boot counter of this boot (0 before `initialize` or after `reset`)
    #[must_use]
    pub const fn boot_count(&self) -> u32 {
        self.boot_count
    }

    /// Read the boot counter back from the durable store
    pub fn persisted_boot_count(&mut self) -> u32 {
        self.counters.get(KEY_BOOTS)
    }

    /// Filesystem outcome of `initialize`
    #[must_use]
    pub const fn filesystem_status(&self) -> FsStatus {
        self.filesystem_status
    }

    /// Check if a delayed restart is armed
    #[must_use]
    pub fn is_restart_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Hardware profile in use
    #[must_use]
    pub const fn profile(&self) -> &HardwareProfile {
        &self.profile
    }

    /// Chip identity, computed on first use
    #[must_use]
    pub fn chip_id(&self) -> ChipId {
        *self
            .chip_id
            .get_or_init(|| ChipId::from_factory_id(self.system.factory_id()))
    }

    /// Reason of the last reset, classified on first use
    #[must_use]
    pub fn last_reboot_reason(&self) -> RebootReason {
        *self.reboot_reason.get_or_init(|| classify(&self.system))
    }

    /// Static chip description
    #[must_use]
    pub fn chip_info(&self) -> ChipInfo {
        self.system.chip_info()
    }

    /// Seconds since boot
    #[must_use]
    pub fn uptime_secs(&self) -> u32 {
        u32::try_from(self.system.uptime_us() / 1_000_000).unwrap_or(u32::MAX)
    }

    /// Platform primitives
    #[must_use]
    pub const fn system(&self) -> &P {
        &self.system
    }

    /// Durable store behind the counters
    #[must_use]
    pub const fn store(&self) -> &S {
        self.counters.backing()
    }
}

impl<P, S, F, T> fmt::Debug for LifecycleController<P, S, F, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleController")
            .field("state", &self.state)
            .field("boot_count", &self.boot_count)
            .field("filesystem", &self.filesystem_status)
            .field("profile", &self.profile.family)
            .finish_non_exhaustive()
    }
}
