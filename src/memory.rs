//! Memory Health Reporter
//!
//! Snapshots of the general-purpose internal heap. DMA-capable and
//! external (PSRAM) pools are not part of the figures.

/// Raw heap statistics from the allocator
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapInfo {
    /// Bytes currently free
    pub free: usize,
    /// Bytes currently allocated
    pub allocated: usize,
    /// Lowest free byte count observed since boot
    pub min_free: usize,
}

/// Source of heap statistics
pub trait HeapStats {
    /// Current statistics of the internal heap
    fn heap_info(&self) -> HeapInfo;
}

/// Point-in-time heap usage
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MemorySnapshot {
    /// Total heap size in bytes
    pub total: usize,
    /// Allocated bytes
    pub used: usize,
    /// Free bytes
    pub free: usize,
    /// Lowest free byte count observed since boot
    pub min_free: usize,
    /// `used / total`, 0 when the heap size is unknown
    pub usage: f32,
}

impl MemorySnapshot {
    /// Build a snapshot from raw allocator statistics
    #[must_use]
    pub fn from_info(info: HeapInfo) -> Self {
        let total = info.free.saturating_add(info.allocated);
        let used = total - info.free;
        let usage = if total == 0 {
            0.0
        } else {
            (used as f32 / total as f32).clamp(0.0, 1.0)
        };

        Self {
            total,
            used,
            free: info.free,
            min_free: info.min_free,
            usage,
        }
    }

    /// Usage in whole percent (0-100, rounded down)
    #[must_use]
    pub fn usage_percent(&self) -> u8 {
        (self.usage * 100.0) as u8
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for MemorySnapshot {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Heap({}/{} used, {}%, min free {})",
            self.used,
            self.total,
            self.usage_percent(),
            self.min_free
        );
    }
}

/// Memory health reporter over a heap statistics source
#[derive(Debug)]
pub struct MemoryReporter<H> {
    heap: H,
}

impl<H: HeapStats> MemoryReporter<H> {
    /// Create a reporter
    #[must_use]
    pub const fn new(heap: H) -> Self {
        Self { heap }
    }

    /// Take a fresh snapshot
    #[must_use]
    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot::from_info(self.heap.heap_info())
    }
}
