//! Reboot Reason Classifier
//!
//! Translates the platform's last-reset code into a closed set of reasons.
//! Codes follow the `esp_reset_reason_t` numbering; other targets map their
//! reset flags into the same space.

use core::fmt;

use crate::platform::SystemControl;

/// Platform reset codes
pub mod code {
    //! Raw last-reset codes (`esp_reset_reason_t`)

    /// Reset reason can not be determined
    pub const UNKNOWN: u32 = 0;
    /// Power-on event
    pub const POWERON: u32 = 1;
    /// External pin
    pub const EXT: u32 = 2;
    /// Software restart
    pub const SW: u32 = 3;
    /// Exception or panic
    pub const PANIC: u32 = 4;
    /// Interrupt watchdog
    pub const INT_WDT: u32 = 5;
    /// Task watchdog
    pub const TASK_WDT: u32 = 6;
    /// Other watchdogs
    pub const WDT: u32 = 7;
    /// Exit from deep sleep
    pub const DEEPSLEEP: u32 = 8;
    /// Brownout
    pub const BROWNOUT: u32 = 9;
    /// Reset over SDIO
    pub const SDIO: u32 = 10;
    /// USB peripheral
    pub const USB: u32 = 11;
    /// JTAG
    pub const JTAG: u32 = 12;
    /// eFuse error
    pub const EFUSE: u32 = 13;
    /// Power glitch
    pub const PWR_GLITCH: u32 = 14;
    /// CPU lock up
    pub const CPU_LOCKUP: u32 = 15;
}

/// Why the chip last reset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum RebootReason {
    /// Power applied
    PowerOn,
    /// Reset pin asserted
    ExternalPin,
    /// Restart requested by firmware
    Software,
    /// Exception or panic
    Panic,
    /// Interrupt watchdog expired
    InterruptWatchdog,
    /// Task watchdog expired
    TaskWatchdog,
    /// Any other watchdog expired
    OtherWatchdog,
    /// Woke up from deep sleep
    DeepSleepExit,
    /// Supply voltage dropped
    Brownout,
    /// Reset over SDIO
    Sdio,
    /// Reset by the USB peripheral
    Usb,
    /// Reset by JTAG
    Jtag,
    /// eFuse error
    EfuseError,
    /// Power glitch detected
    PowerGlitch,
    /// CPU locked up
    CpuLockup,
    /// Not determinable or not recognized
    #[default]
    Unknown,
}

impl RebootReason {
    /// Every reason, in code order
    pub const ALL: [Self; 16] = [
        Self::Unknown,
        Self::PowerOn,
        Self::ExternalPin,
        Self::Software,
        Self::Panic,
        Self::InterruptWatchdog,
        Self::TaskWatchdog,
        Self::OtherWatchdog,
        Self::DeepSleepExit,
        Self::Brownout,
        Self::Sdio,
        Self::Usb,
        Self::Jtag,
        Self::EfuseError,
        Self::PowerGlitch,
        Self::CpuLockup,
    ];

    /// Classify a raw platform code; unrecognized codes are `Unknown`
    #[must_use]
    pub const fn from_code(raw: u32) -> Self {
        match raw {
            code::POWERON => Self::PowerOn,
            code::EXT => Self::ExternalPin,
            code::SW => Self::Software,
            code::PANIC => Self::Panic,
            code::INT_WDT => Self::InterruptWatchdog,
            code::TASK_WDT => Self::TaskWatchdog,
            code::WDT => Self::OtherWatchdog,
            code::DEEPSLEEP => Self::DeepSleepExit,
            code::BROWNOUT => Self::Brownout,
            code::SDIO => Self::Sdio,
            code::USB => Self::Usb,
            code::JTAG => Self::Jtag,
            code::EFUSE => Self::EfuseError,
            code::PWR_GLITCH => Self::PowerGlitch,
            code::CPU_LOCKUP => Self::CpuLockup,
            _ => Self::Unknown,
        }
    }

    /// Platform code of this reason
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Unknown => code::UNKNOWN,
            Self::PowerOn => code::POWERON,
            Self::ExternalPin => code::EXT,
            Self::Software => code::SW,
            Self::Panic => code::PANIC,
            Self::InterruptWatchdog => code::INT_WDT,
            Self::TaskWatchdog => code::TASK_WDT,
            Self::OtherWatchdog => code::WDT,
            Self::DeepSleepExit => code::DEEPSLEEP,
            Self::Brownout => code::BROWNOUT,
            Self::Sdio => code::SDIO,
            Self::Usb => code::USB,
            Self::Jtag => code::JTAG,
            Self::EfuseError => code::EFUSE,
            Self::PowerGlitch => code::PWR_GLITCH,
            Self::CpuLockup => code::CPU_LOCKUP,
        }
    }

    /// Stable human-readable label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PowerOn => "Power On",
            Self::ExternalPin => "External Pin",
            Self::Software => "Software",
            Self::Panic => "Panic",
            Self::InterruptWatchdog => "Interrupt Watchdog",
            Self::TaskWatchdog => "Task Watchdog",
            Self::OtherWatchdog => "Other Watchdog",
            Self::DeepSleepExit => "Deep Sleep Exit",
            Self::Brownout => "Brownout",
            Self::Sdio => "SDIO",
            Self::Usb => "USB Peripheral",
            Self::Jtag => "JTAG",
            Self::EfuseError => "EFUSE Error",
            Self::PowerGlitch => "Power Glitch",
            Self::CpuLockup => "CPU Lockup",
            Self::Unknown => "Unknown",
        }
    }

    /// Check if the reset was caused by a fault rather than a request
    #[must_use]
    pub const fn is_abnormal(self) -> bool {
        matches!(
            self,
            Self::Panic
                | Self::InterruptWatchdog
                | Self::TaskWatchdog
                | Self::OtherWatchdog
                | Self::Brownout
                | Self::PowerGlitch
                | Self::CpuLockup
        )
    }
}

impl fmt::Display for RebootReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for RebootReason {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.as_str());
    }
}

/// Classify the last reset of the running chip
#[must_use]
pub fn classify<P: SystemControl + ?Sized>(system: &P) -> RebootReason {
    RebootReason::from_code(system.reset_code())
}
