//! Host fakes for the platform seam
//!
//! Shared by the integration tests. Restart and abort are modelled as
//! panics with typed payloads, caught with `expect_restart` / `expect_abort`.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use lifecycle_firmware::config::FsOptions;
use lifecycle_firmware::embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashErrorKind, ReadNorFlash,
};
use lifecycle_firmware::crash::{CrashSource, RawCrashSummary};
use lifecycle_firmware::memory::{HeapInfo, HeapStats};
use lifecycle_firmware::platform::{Clock, Filesystem, PlatformError, SystemControl};
use lifecycle_firmware::store::{DurableStore, StoreError};
use lifecycle_firmware::types::ChipInfo;

// =============================================================================
// Restart / Abort Capture
// =============================================================================

/// Panic payload of a fake chip restart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restarted;

/// Panic payload of a fake chip abort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aborted(pub String);

/// Run `f` and assert that it restarted the chip
pub fn expect_restart<R>(f: impl FnOnce() -> R) {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(_) => panic!("expected a restart, call returned"),
        Err(payload) => assert!(
            payload.downcast_ref::<Restarted>().is_some(),
            "expected a restart, got another panic"
        ),
    }
}

/// Run `f` and return the abort reason it raised
pub fn expect_abort<R>(f: impl FnOnce() -> R) -> String {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(_) => panic!("expected an abort, call returned"),
        Err(payload) => match payload.downcast::<Aborted>() {
            Ok(aborted) => aborted.0,
            Err(_) => panic!("expected an abort, got another panic"),
        },
    }
}

// =============================================================================
// Durable Store
// =============================================================================

/// Flash contents, shared across simulated power cycles
#[derive(Debug, Default)]
pub struct FlashState {
    pub values: HashMap<(String, String), u32>,
    /// `init` reports a stale layout until the next erase
    pub needs_erase: bool,
    /// `init` always fails
    pub broken: bool,
    /// `erase_all` fails
    pub erase_fails: bool,
    /// `erase_all` leaves the layout stale
    pub stays_stale: bool,
    pub open_fails: bool,
    pub put_fails: bool,
    pub erase_count: u32,
    pub init_count: u32,
}

/// In-memory durable store; clones share the same flash
#[derive(Debug, Clone, Default)]
pub struct FakeStore {
    pub flash: Rc<RefCell<FlashState>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose layout must be erased before use
    pub fn stale() -> Self {
        let store = Self::new();
        store.flash.borrow_mut().needs_erase = true;
        store
    }

    pub fn value(&self, namespace: &str, key: &str) -> Option<u32> {
        self.flash
            .borrow()
            .values
            .get(&(namespace.to_string(), key.to_string()))
            .copied()
    }

    pub fn set(&self, namespace: &str, key: &str, value: u32) {
        self.flash
            .borrow_mut()
            .values
            .insert((namespace.to_string(), key.to_string()), value);
    }
}

impl DurableStore for FakeStore {
    type Handle = String;

    fn init(&mut self) -> Result<(), StoreError> {
        let mut flash = self.flash.borrow_mut();
        flash.init_count += 1;
        if flash.broken {
            Err(StoreError::Io(-1))
        } else if flash.needs_erase {
            Err(StoreError::NeedsErase)
        } else {
            Ok(())
        }
    }

    fn open(&mut self, namespace: &str) -> Result<Self::Handle, StoreError> {
        if self.flash.borrow().open_fails {
            Err(StoreError::Unavailable)
        } else {
            Ok(namespace.to_string())
        }
    }

    fn get_u32(&mut self, handle: &Self::Handle, key: &str, default: u32) -> u32 {
        self.value(handle, key).unwrap_or(default)
    }

    fn put_u32(&mut self, handle: &Self::Handle, key: &str, value: u32) -> Result<(), StoreError> {
        if self.flash.borrow().put_fails {
            return Err(StoreError::Io(-2));
        }
        self.set(handle, key, value);
        Ok(())
    }

    fn close(&mut self, _handle: Self::Handle) {}

    fn erase_all(&mut self) -> Result<(), StoreError> {
        let mut flash = self.flash.borrow_mut();
        flash.erase_count += 1;
        if flash.erase_fails {
            return Err(StoreError::Io(-9));
        }
        flash.values.clear();
        flash.needs_erase = flash.stays_stale;
        Ok(())
    }
}

// =============================================================================
// Chip Primitives
// =============================================================================

/// Side effect observed on the fake chip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Restart,
    Abort(String),
    SetBoot(String),
    EndSerial(u8),
    StopWifi,
    StopBluetooth,
    DeepSleep(u64),
}

/// Fake chip recording every primitive call
#[derive(Debug, Clone)]
pub struct FakeSystem {
    pub events: Rc<RefCell<Vec<Event>>>,
    pub reset_code: u32,
    pub factory_id: u64,
    pub uptime_us: u64,
    pub partitions: Vec<String>,
    pub set_boot_fails: bool,
    pub wifi_fails: bool,
}

impl Default for FakeSystem {
    fn default() -> Self {
        Self {
            events: Rc::default(),
            reset_code: 1,
            factory_id: 0x5634_12C4_0A24,
            uptime_us: 0,
            partitions: vec!["safeboot".to_string()],
            set_boot_fails: false,
            wifi_fails: false,
        }
    }
}

impl FakeSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reset_code(reset_code: u32) -> Self {
        Self {
            reset_code,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

impl SystemControl for FakeSystem {
    type Partition = String;

    fn restart(&self) -> ! {
        self.record(Event::Restart);
        panic::panic_any(Restarted)
    }

    fn abort(&self, reason: &str) -> ! {
        self.record(Event::Abort(reason.to_string()));
        panic::panic_any(Aborted(reason.to_string()))
    }

    fn reset_code(&self) -> u32 {
        self.reset_code
    }

    fn factory_id(&self) -> u64 {
        self.factory_id
    }

    fn chip_info(&self) -> ChipInfo {
        ChipInfo {
            model: "ESP32",
            cores: 2,
            revision: 3,
            cpu_freq_mhz: 240,
        }
    }

    fn uptime_us(&self) -> u64 {
        self.uptime_us
    }

    fn find_factory_partition(&self, label: &str) -> Option<Self::Partition> {
        self.partitions.iter().find(|p| *p == label).cloned()
    }

    fn set_boot_partition(&mut self, partition: &Self::Partition) -> Result<(), PlatformError> {
        if self.set_boot_fails {
            return Err(PlatformError::Failed(-1));
        }
        self.record(Event::SetBoot(partition.clone()));
        Ok(())
    }

    fn end_serial(&mut self, port: u8) {
        self.record(Event::EndSerial(port));
    }

    fn stop_wifi(&mut self) -> Result<(), PlatformError> {
        if self.wifi_fails {
            return Err(PlatformError::Failed(0x3001));
        }
        self.record(Event::StopWifi);
        Ok(())
    }

    fn stop_bluetooth(&mut self) -> Result<(), PlatformError> {
        self.record(Event::StopBluetooth);
        Ok(())
    }

    fn deep_sleep(&mut self, micros: u64) {
        // Suspend "fails": the controller must fall back to a restart
        self.record(Event::DeepSleep(micros));
    }
}

// =============================================================================
// Filesystem
// =============================================================================

/// Filesystem with scripted mount results (`Ok` once the script runs out)
#[derive(Debug, Clone, Default)]
pub struct FakeFs {
    pub results: Rc<RefCell<VecDeque<Result<(), PlatformError>>>>,
    /// `format` flag of every mount call
    pub mounts: Rc<RefCell<Vec<bool>>>,
}

impl FakeFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(results: &[Result<(), PlatformError>]) -> Self {
        let fs = Self::new();
        fs.results.borrow_mut().extend(results.iter().copied());
        fs
    }

    pub fn mounts(&self) -> Vec<bool> {
        self.mounts.borrow().clone()
    }
}

impl Filesystem for FakeFs {
    fn mount(&mut self, format: bool, _options: &FsOptions) -> Result<(), PlatformError> {
        self.mounts.borrow_mut().push(format);
        self.results.borrow_mut().pop_front().unwrap_or(Ok(()))
    }
}

// =============================================================================
// Clock, Heap, Crash Record
// =============================================================================

/// Clock advanced by hand
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn at(ms: u64) -> Self {
        Self { now: Cell::new(ms) }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// Fixed heap statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeHeap(pub HeapInfo);

impl HeapStats for FakeHeap {
    fn heap_info(&self) -> HeapInfo {
        self.0
    }
}

/// Retained crash record
#[derive(Debug, Clone, Default)]
pub struct FakeCrash {
    pub present: bool,
    pub task: String,
    pub reported_depth: u32,
    pub frames: Vec<u32>,
    pub stack_dump: Vec<u8>,
    pub corrupted: bool,
    /// Raw panic reason bytes, `None` when not stored
    pub reason: Option<Vec<u8>>,
}

impl FakeCrash {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn unwound(task: &str, frames: &[u32], reason: &str) -> Self {
        Self {
            present: true,
            task: task.to_string(),
            reported_depth: u32::try_from(frames.len()).unwrap(),
            frames: frames.to_vec(),
            reason: Some(reason.as_bytes().to_vec()),
            ..Self::default()
        }
    }

    pub fn stack(task: &str, stack_dump: &[u8], reason: &str) -> Self {
        Self {
            present: true,
            task: task.to_string(),
            stack_dump: stack_dump.to_vec(),
            reason: Some(reason.as_bytes().to_vec()),
            ..Self::default()
        }
    }
}

impl CrashSource for FakeCrash {
    fn summary(&self) -> Option<RawCrashSummary<'_>> {
        self.present.then(|| RawCrashSummary {
            task: &self.task,
            reported_depth: self.reported_depth,
            frames: &self.frames,
            stack_dump: &self.stack_dump,
            corrupted: self.corrupted,
        })
    }

    fn panic_reason(&self, buf: &mut [u8]) -> Result<usize, PlatformError> {
        let reason = self.reason.as_ref().ok_or(PlatformError::Failed(0x105))?;
        let len = reason.len().min(buf.len());
        buf[..len].copy_from_slice(&reason[..len]);
        Ok(len)
    }
}

// =============================================================================
// NOR Flash
// =============================================================================

/// RAM-backed NOR flash; clones share the same cells
///
/// Writes can only clear bits, like real NOR. `power_cut_after(n)` lets `n`
/// more erase/write operations through and fails every later one without
/// touching the cells.
#[derive(Debug, Clone)]
pub struct RamFlash {
    pub cells: Rc<RefCell<Vec<u8>>>,
    ops_left: Rc<Cell<Option<usize>>>,
}

impl RamFlash {
    pub const PAGE: u32 = 1024;

    /// Two erased pages
    pub fn new() -> Self {
        Self {
            cells: Rc::new(RefCell::new(vec![0xFF; 2 * Self::PAGE as usize])),
            ops_left: Rc::default(),
        }
    }

    pub fn power_cut_after(&self, ops: usize) {
        self.ops_left.set(Some(ops));
    }

    pub fn power_restored(&self) {
        self.ops_left.set(None);
    }

    pub fn bytes(&self, offset: u32, len: usize) -> Vec<u8> {
        let at = offset as usize;
        self.cells.borrow()[at..at + len].to_vec()
    }

    pub fn u32_at(&self, offset: u32) -> u32 {
        let b = self.bytes(offset, 4);
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }

    fn spend_op(&self) -> Result<(), NorFlashErrorKind> {
        match self.ops_left.get() {
            Some(0) => Err(NorFlashErrorKind::Other),
            Some(n) => {
                self.ops_left.set(Some(n - 1));
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn check(&self, offset: u32, len: usize) -> Result<usize, NorFlashErrorKind> {
        let at = offset as usize;
        if at + len > self.cells.borrow().len() {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        Ok(at)
    }
}

impl ErrorType for RamFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for RamFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let at = self.check(offset, bytes.len())?;
        bytes.copy_from_slice(&self.cells.borrow()[at..at + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.cells.borrow().len()
    }
}

impl NorFlash for RamFlash {
    const WRITE_SIZE: usize = 8;
    const ERASE_SIZE: usize = Self::PAGE as usize;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        let at = self.check(from, (to - from) as usize)?;
        self.spend_op()?;
        self.cells.borrow_mut()[at..to as usize].fill(0xFF);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if offset as usize % Self::WRITE_SIZE != 0 || bytes.len() % Self::WRITE_SIZE != 0 {
            return Err(NorFlashErrorKind::NotAligned);
        }
        let at = self.check(offset, bytes.len())?;
        self.spend_op()?;
        for (cell, b) in self.cells.borrow_mut()[at..].iter_mut().zip(bytes) {
            *cell &= *b;
        }
        Ok(())
    }
}
