//! Hardware Profiles
//!
//! Capability description of a chip family: how many serial consoles to
//! close before sleeping, which radios exist, and where the crash backtrace
//! comes from. Selected once at build time and injected.

/// Origin of the backtrace in a crash record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BacktraceSource {
    /// Program counters recovered by the register window unwinder (Xtensa)
    RegisterUnwind,
    /// Raw stack words copied at the time of the panic (RISC-V, Cortex-M)
    StackDump,
}

#[cfg(feature = "embedded")]
impl defmt::Format for BacktraceSource {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::RegisterUnwind => defmt::write!(f, "unwind"),
            Self::StackDump => defmt::write!(f, "stackdump"),
        }
    }
}

/// Capabilities of a chip family
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HardwareProfile {
    /// Family name
    pub family: &'static str,
    /// Number of high-power UART consoles
    pub uart_count: u8,
    /// Chip has a Wi-Fi radio
    pub has_wifi: bool,
    /// Chip has a Bluetooth radio
    pub has_bluetooth: bool,
    /// Backtrace format of crash records
    pub backtrace: BacktraceSource,
}

impl HardwareProfile {
    /// Original dual-core Xtensa ESP32
    pub const ESP32: Self = Self {
        family: "ESP32",
        uart_count: 3,
        has_wifi: true,
        has_bluetooth: true,
        backtrace: BacktraceSource::RegisterUnwind,
    };

    /// Single-core Xtensa ESP32-S2 (no Bluetooth)
    pub const ESP32_S2: Self = Self {
        family: "ESP32-S2",
        uart_count: 2,
        has_wifi: true,
        has_bluetooth: false,
        backtrace: BacktraceSource::RegisterUnwind,
    };

    /// Dual-core Xtensa ESP32-S3
    pub const ESP32_S3: Self = Self {
        family: "ESP32-S3",
        uart_count: 3,
        has_wifi: true,
        has_bluetooth: true,
        backtrace: BacktraceSource::RegisterUnwind,
    };

    /// RISC-V ESP32-C3
    pub const ESP32_C3: Self = Self {
        family: "ESP32-C3",
        uart_count: 2,
        has_wifi: true,
        has_bluetooth: true,
        backtrace: BacktraceSource::StackDump,
    };

    /// RISC-V ESP32-C6
    pub const ESP32_C6: Self = Self {
        family: "ESP32-C6",
        uart_count: 2,
        has_wifi: true,
        has_bluetooth: true,
        backtrace: BacktraceSource::StackDump,
    };

    /// STM32G474 board (console over RTT, no radios)
    pub const STM32G474: Self = Self {
        family: "STM32G474",
        uart_count: 0,
        has_wifi: false,
        has_bluetooth: false,
        backtrace: BacktraceSource::StackDump,
    };

    /// Check if the chip has any radio that must be stopped before sleeping
    #[must_use]
    pub const fn has_radio(&self) -> bool {
        self.has_wifi || self.has_bluetooth
    }
}

impl Default for HardwareProfile {
    fn default() -> Self {
        Self::ESP32
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for HardwareProfile {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "{}(uarts={}, wifi={}, bt={}, {})",
            self.family,
            self.uart_count,
            self.has_wifi,
            self.has_bluetooth,
            self.backtrace
        );
    }
}
