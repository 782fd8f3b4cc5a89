//! Shared types used across the lifecycle firmware
//!
//! Chip identity and static chip description.

use core::fmt;
use core::fmt::Write as _;

use heapless::String;

/// 32-bit chip identity folded from the factory id
///
/// The factory id is the 48-bit eFuse MAC (or board UID). Its three most
/// significant bytes become the identity, byte 5 landing in the low bits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChipId(u32);

impl ChipId {
    /// Derive from a 48-bit factory id
    #[must_use]
    pub const fn from_factory_id(factory_id: u64) -> Self {
        let mut id = 0u32;
        let mut shift = 0;
        while shift < 24 {
            id |= (((factory_id >> (40 - shift)) & 0xff) as u32) << shift;
            shift += 8;
        }
        Self(id)
    }

    /// Create from a raw value
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw value
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Uppercase hex text without leading zeros
    #[must_use]
    pub fn to_hex(self) -> String<8> {
        let mut text = String::new();
        // 8 hex digits always fit
        let _ = write!(text, "{:X}", self.0);
        text
    }
}

impl fmt::Debug for ChipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChipId({:X})", self.0)
    }
}

impl fmt::Display for ChipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ChipId {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{:X}", self.0);
    }
}

/// Static chip description
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChipInfo {
    /// Chip model name
    pub model: &'static str,
    /// Number of CPU cores
    pub cores: u8,
    /// Silicon revision
    pub revision: u16,
    /// CPU frequency in MHz
    pub cpu_freq_mhz: u32,
}

#[cfg(feature = "embedded")]
impl defmt::Format for ChipInfo {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "{} rev {} ({} cores @ {}MHz)",
            self.model,
            self.revision,
            self.cores,
            self.cpu_freq_mhz
        );
    }
}
