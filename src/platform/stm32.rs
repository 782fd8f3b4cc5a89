//! STM32G474 Board Binding
//!
//! Implements the platform traits on the STM32G474:
//!
//! - restart through `SCB::sys_reset`
//! - reset cause from the RCC/PWR flags, translated into reset codes
//! - chip identity from the 96-bit unique id
//! - heap statistics from the `linked_list_allocator` heap
//!
//! The durable store is a [`FlashStore`](crate::store::FlashStore) over the
//! blocking flash driver.
//!
//! The board has no factory image, no radios and no timed deep sleep
//! wiring; those primitives report "not found" / "not supported".

use core::sync::atomic::{AtomicUsize, Ordering};

use cortex_m::peripheral::SCB;
use embassy_stm32::pac;
use linked_list_allocator::LockedHeap;

use crate::config::{STM32_CHIP_MODEL, SYSTEM_CLOCK_HZ};
use crate::memory::{HeapInfo, HeapStats};
use crate::platform::{PlatformError, ResetFlags, SystemControl};
use crate::types::ChipInfo;

/// Chip primitives of the STM32G474
#[derive(Clone, Copy, Debug)]
pub struct Stm32System {
    reset_code: u32,
    revision: u16,
}

impl Stm32System {
    /// Latch and clear the reset flags of this boot
    ///
    /// Call once, early in `main`: the flags are cleared so the next boot
    /// sees only its own cause.
    #[must_use]
    pub fn capture() -> Self {
        // PWR registers read as zero while the PWR clock is gated
        pac::RCC.apb1enr1().modify(|w| w.set_pwren(true));

        let standby = pac::PWR.sr1().read().sbf();
        if standby {
            pac::PWR.scr().write(|w| w.set_csbf(true));
        }

        let csr = pac::RCC.csr().read();
        pac::RCC.csr().modify(|w| w.set_rmvf(true));

        let reset_code = ResetFlags {
            standby,
            independent_watchdog: csr.iwdgrstf(),
            window_watchdog: csr.wwdgrstf(),
            software: csr.sftrstf(),
            brownout: csr.borrstf(),
            pin: csr.pinrstf(),
        }
        .code();

        Self {
            reset_code,
            revision: pac::DBGMCU.idcode().read().rev_id(),
        }
    }
}

impl SystemControl for Stm32System {
    type Partition = core::convert::Infallible;

    fn restart(&self) -> ! {
        SCB::sys_reset()
    }

    fn reset_code(&self) -> u32 {
        self.reset_code
    }

    fn factory_id(&self) -> u64 {
        let uid = embassy_stm32::uid::uid();
        u64::from_le_bytes([uid[0], uid[1], uid[2], uid[3], uid[4], uid[5], 0, 0])
    }

    fn chip_info(&self) -> ChipInfo {
        ChipInfo {
            model: STM32_CHIP_MODEL,
            cores: 1,
            revision: self.revision,
            cpu_freq_mhz: SYSTEM_CLOCK_HZ / 1_000_000,
        }
    }

    fn uptime_us(&self) -> u64 {
        embassy_time::Instant::now().as_micros()
    }

    fn find_factory_partition(&self, _label: &str) -> Option<Self::Partition> {
        None
    }

    fn set_boot_partition(&mut self, partition: &Self::Partition) -> Result<(), PlatformError> {
        match *partition {}
    }

    fn end_serial(&mut self, _port: u8) {}

    fn stop_wifi(&mut self) -> Result<(), PlatformError> {
        Err(PlatformError::NotSupported)
    }

    fn stop_bluetooth(&mut self) -> Result<(), PlatformError> {
        Err(PlatformError::NotSupported)
    }

    fn deep_sleep(&mut self, _micros: u64) {
        defmt::warn!("Timed standby needs the RTC wakeup timer, not configured on this board");
    }
}

/// Heap statistics of the global `linked_list_allocator` heap
pub struct Stm32Heap {
    heap: &'static LockedHeap,
    min_free: AtomicUsize,
}

impl Stm32Heap {
    /// Wrap the global heap
    #[must_use]
    pub const fn new(heap: &'static LockedHeap) -> Self {
        Self {
            heap,
            min_free: AtomicUsize::new(usize::MAX),
        }
    }
}

impl HeapStats for Stm32Heap {
    fn heap_info(&self) -> HeapInfo {
        let (free, allocated) = {
            let heap = self.heap.lock();
            (heap.free(), heap.used())
        };
        // Watermark is only as fine-grained as the queries
        let min_free = self.min_free.fetch_min(free, Ordering::Relaxed).min(free);
        HeapInfo {
            free,
            allocated,
            min_free,
        }
    }
}
