//! STM32 Reset Flags
//!
//! Reset cause latched by RCC_CSR and PWR_SR1, translated into the reset
//! code space the classifier understands.

use crate::reboot::code;

/// Reset cause flags of one boot
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResetFlags {
    /// PWR_SR1.SBF: woke up from standby
    pub standby: bool,
    /// RCC_CSR.IWDGRSTF
    pub independent_watchdog: bool,
    /// RCC_CSR.WWDGRSTF
    pub window_watchdog: bool,
    /// RCC_CSR.SFTRSTF
    pub software: bool,
    /// RCC_CSR.BORRSTF: power-on or brown-out
    pub brownout: bool,
    /// RCC_CSR.PINRSTF
    pub pin: bool,
}

impl ResetFlags {
    /// Reset code for these flags
    ///
    /// Any internal reset also pulls NRST, so the pin flag is checked last.
    #[must_use]
    pub const fn code(self) -> u32 {
        if self.standby {
            code::DEEPSLEEP
        } else if self.independent_watchdog || self.window_watchdog {
            code::WDT
        } else if self.software {
            code::SW
        } else if self.brownout {
            code::POWERON
        } else if self.pin {
            code::EXT
        } else {
            code::UNKNOWN
        }
    }
}
