//! System Report
//!
//! The field set handed to the monitoring layer for JSON export. Field
//! names match the keys the reporting layer expects when serialized with
//! the `serde` feature.

use heapless::String;

use crate::crash::{CrashExtractor, CrashSource, CrashSummary};
use crate::lifecycle::{LifecycleController, RestartScheduler};
use crate::memory::{HeapStats, MemoryReporter};
use crate::platform::{Filesystem, SystemControl};
use crate::store::DurableStore;

/// Snapshot of everything the reporting layer exports
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SystemReport {
    /// Chip identity as uppercase hex
    pub chip_id: String<8>,
    /// Number of CPU cores
    pub chip_cores: u8,
    /// Chip model name
    pub chip_model: &'static str,
    /// Silicon revision
    pub chip_revision: u16,
    /// CPU frequency in MHz
    pub cpu_freq: u32,
    /// Heap size in bytes
    pub heap_total: usize,
    /// Heap usage ratio (0-1)
    pub heap_usage: f32,
    /// Allocated heap bytes
    pub heap_used: usize,
    /// Free heap bytes
    pub heap_free: usize,
    /// Lowest free heap bytes since boot
    pub heap_min_free: usize,
    /// Last reboot reason label
    pub reboot_reason: &'static str,
    /// Boot counter
    pub reboot_count: u32,
    /// Seconds since boot
    pub uptime: u32,
    /// Crash summary of the previous abnormal reset
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub crash: Option<CrashSummary>,
}

impl SystemReport {
    /// Gather a report from the controller and the diagnostic sources
    #[must_use]
    pub fn collect<P, S, F, T, H, C>(
        controller: &LifecycleController<P, S, F, T>,
        memory: &MemoryReporter<H>,
        crash: &CrashExtractor<C>,
    ) -> Self
    where
        P: SystemControl,
        S: DurableStore,
        F: Filesystem,
        T: RestartScheduler,
        H: HeapStats,
        C: CrashSource,
    {
        let chip = controller.chip_info();
        let heap = memory.snapshot();

        Self {
            chip_id: controller.chip_id().to_hex(),
            chip_cores: chip.cores,
            chip_model: chip.model,
            chip_revision: chip.revision,
            cpu_freq: chip.cpu_freq_mhz,
            heap_total: heap.total,
            heap_usage: heap.usage,
            heap_used: heap.used,
            heap_free: heap.free,
            heap_min_free: heap.min_free,
            reboot_reason: controller.last_reboot_reason().as_str(),
            reboot_count: controller.boot_count(),
            uptime: controller.uptime_secs(),
            crash: crash.try_extract(),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for SystemReport {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "{=str} {=str} rev {} boot #{} ({=str}), up {}s, heap {}/{}",
            self.chip_id.as_str(),
            self.chip_model,
            self.chip_revision,
            self.reboot_count,
            self.reboot_reason,
            self.uptime,
            self.heap_used,
            self.heap_total
        );
    }
}
