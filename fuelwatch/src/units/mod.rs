//! Integer-only conversion of micro-liters to display units.
//!
//! Volumes are shown in liters and US gallons with two fractional digits.
//! Both are truncated, never rounded, and computed without floating point
//! so every platform prints the same figures.

use std::fmt;

use serde::Serialize;

/// Micro-liters per liter.
pub const MICRO_L_PER_L: u64 = 1_000_000;

/// US gallons per liter, scaled by 10^6 (0.264172).
pub const MICRO_GAL_PER_L: u64 = 264_172;

/// A non-negative decimal with two truncated fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Fixed2 {
    /// Whole part.
    pub int: u64,
    /// Hundredths, 0-99.
    pub frac: u8,
}

impl Fixed2 {
    /// Split a micro-unit value into whole units and truncated hundredths.
    pub fn from_micro(micro: u64) -> Self {
        Self {
            int: micro / 1_000_000,
            frac: ((micro / 10_000) % 100) as u8,
        }
    }
}

impl fmt::Display for Fixed2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.int, self.frac)
    }
}

/// A volume in both display units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Volume {
    /// Liters.
    pub liters: Fixed2,
    /// US gallons.
    pub gallons: Fixed2,
}

impl Volume {
    /// Convert a micro-liter volume.
    pub fn from_micro_l(micro_l: u64) -> Self {
        Self {
            liters: Fixed2::from_micro(micro_l),
            gallons: Fixed2::from_micro(micro_l_to_micro_gal(micro_l)),
        }
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} L ({} gal)", self.liters, self.gallons)
    }
}

/// Micro-liters to micro-US-gallons, truncated.
pub fn micro_l_to_micro_gal(micro_l: u64) -> u64 {
    let micro_gal = u128::from(micro_l) * u128::from(MICRO_GAL_PER_L) / u128::from(MICRO_L_PER_L);
    // 0.264172 < 1, so the result always fits
    micro_gal as u64
}

/// Convert micro-liters to `(liters_int, liters_frac2, gallons_int, gallons_frac2)`.
pub fn convert(micro_l: u64) -> (u64, u8, u64, u8) {
    let volume = Volume::from_micro_l(micro_l);
    (
        volume.liters.int,
        volume.liters.frac,
        volume.gallons.int,
        volume.gallons.frac,
    )
}
