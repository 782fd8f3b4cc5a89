//! Lifecycle Node Main Application
//!
//! Entry point for the STM32G474 lifecycle firmware.
//! Counts the boot, reports why the chip reset and keeps the delayed
//! restart timer running.

#![no_std]
#![no_main]

use core::mem::MaybeUninit;

use defmt::{info, warn};
use embassy_executor::Spawner;
use embassy_stm32::flash::Flash;
use embassy_time::Timer;
use linked_list_allocator::LockedHeap;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use lifecycle_firmware::crash::NoCrashRecord;
use lifecycle_firmware::platform::stm32::{Stm32Heap, Stm32System};
use lifecycle_firmware::platform::NoFilesystem;
use lifecycle_firmware::prelude::*;
use lifecycle_firmware::runtime::{drive_restart_timer, EmbassyClock};
use lifecycle_firmware::store::FlashStore;

/// Heap usage that triggers a preventive restart
const HEAP_RESTART_USAGE: f32 = 0.95;

/// Delay before the preventive restart, in milliseconds
const HEAP_RESTART_DELAY_MS: u32 = 1_000;

/// Seconds between two system reports
const REPORT_INTERVAL_SECS: u64 = 60;

#[global_allocator]
static HEAP: LockedHeap = LockedHeap::empty();

static HEAP_MEM: StaticCell<[MaybeUninit<u8>; STM32_HEAP_BYTES]> = StaticCell::new();

static SCHEDULER: TickScheduler<EmbassyClock> = TickScheduler::new(EmbassyClock);

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Lifecycle Firmware v{}", env!("CARGO_PKG_VERSION"));

    // Latch the reset flags before anything else can reset them
    let system = Stm32System::capture();

    let config = embassy_stm32::Config::default();
    let p = embassy_stm32::init(config);

    HEAP.lock()
        .init_from_slice(HEAP_MEM.init([MaybeUninit::uninit(); STM32_HEAP_BYTES]));

    let profile = HardwareProfile::STM32G474;
    let store = FlashStore::new(
        Flash::new_blocking(p.FLASH),
        STM32_STORE_OFFSET,
        STM32_FLASH_PAGE_SIZE,
    );
    let mut lifecycle = LifecycleController::new(system, store, NoFilesystem, &SCHEDULER, profile);

    match lifecycle.initialize(&InitOptions::without_filesystem()) {
        Ok(boot) => info!(
            "Boot #{} after {} reset, filesystem {}",
            boot.boot_count, boot.reboot_reason, boot.filesystem
        ),
        Err(e) => warn!("Initialization skipped: {}", e),
    }
    info!("Chip {}", lifecycle.chip_id());

    spawner.spawn(restart_task(&SCHEDULER, system)).unwrap();

    let memory = MemoryReporter::new(Stm32Heap::new(&HEAP));
    let crash = CrashExtractor::new(NoCrashRecord, profile.backtrace);

    loop {
        let report = SystemReport::collect(&lifecycle, &memory, &crash);
        info!("{}", report);

        if report.heap_usage > HEAP_RESTART_USAGE && !lifecycle.is_restart_pending() {
            warn!("Heap nearly exhausted");
            lifecycle.restart(HEAP_RESTART_DELAY_MS);
        }

        Timer::after(Duration::from_secs(REPORT_INTERVAL_SECS)).await;
    }
}

/// Restart task - fires the delayed restart once it is due
#[embassy_executor::task]
async fn restart_task(scheduler: &'static TickScheduler<EmbassyClock>, system: Stm32System) {
    drive_restart_timer(scheduler, &system).await
}

