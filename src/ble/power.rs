//! Transmit Power Table
//!
//! Eight fixed output levels, lowest first. Callers pick a level by index.

use crate::config::DEFAULT_TX_POWER_INDEX;
use crate::error::RadioError;

/// Number of selectable power levels
pub const POWER_LEVELS: usize = 8;

/// Output power per level index (dBm)
pub const POWER_LEVEL_DBM: [i8; POWER_LEVELS] = [-30, -20, -16, -12, -8, -4, 0, 4];

/// Validated index into [`POWER_LEVEL_DBM`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerLevel(u8);

impl PowerLevel {
    pub const MIN: PowerLevel = PowerLevel(0);
    pub const MAX: PowerLevel = PowerLevel(POWER_LEVELS as u8 - 1);
    pub const DEFAULT: PowerLevel = PowerLevel(DEFAULT_TX_POWER_INDEX);

    /// Accepts `0 <= index < 8`
    pub const fn new(index: i32) -> Result<Self, RadioError> {
        if index < 0 || index >= POWER_LEVELS as i32 {
            return Err(RadioError::InvalidParameter);
        }
        Ok(PowerLevel(index as u8))
    }

    pub const fn index(self) -> u8 {
        self.0
    }

    pub const fn dbm(self) -> i8 {
        POWER_LEVEL_DBM[self.0 as usize]
    }

    pub fn iter() -> impl Iterator<Item = PowerLevel> {
        (0..POWER_LEVELS as u8).map(PowerLevel)
    }
}

impl TryFrom<i32> for PowerLevel {
    type Error = RadioError;

    fn try_from(index: i32) -> Result<Self, Self::Error> {
        PowerLevel::new(index)
    }
}
