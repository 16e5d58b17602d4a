//! GAP State
//!
//! Bookkeeping the radio session keeps about what it last told the stack:
//! the advertising mode, whether it is transmitting, and pairing status.

use super::advertising::{AdvertisingInterval, AdvertisingType};
use super::power::PowerLevel;

/// Maximum device name length accepted by the session
pub const MAX_DEVICE_NAME_LEN: usize = 32;

/// Sentinel for "no connection"
pub const INVALID_CONN_HANDLE: u16 = 0xFFFF;

/// Advertising mode enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AdvertisingMode {
    None = 0,
    Connectable = 1,
    EddystoneUrl = 2,
    IBeacon = 3,
}

// Pairing status bit positions
pub const PAIR_REQUEST: u8 = 0x01;
pub const PAIR_COMPLETE: u8 = 0x02;
pub const PAIR_PASSCODE: u8 = 0x04;
pub const PAIR_SUCCESSFUL: u8 = 0x08;

/// Bit-packed pairing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PairingStatus(pub u8);

impl PairingStatus {
    pub const fn contains(self, flag: u8) -> bool {
        self.0 & flag == flag
    }

    pub fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }

    pub fn clear(&mut self, flag: u8) {
        self.0 &= !flag;
    }
}

/// Radio state as last commanded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapState {
    pub initialized: bool,
    pub mode: AdvertisingMode,
    /// Transmitting sub-state; `stop_advertising` only clears this
    pub advertising: bool,
    pub adv_type: Option<AdvertisingType>,
    pub interval: Option<AdvertisingInterval>,
    pub tx_power: Option<PowerLevel>,
    pub pairing: PairingStatus,
    /// Connection to drop on the next idle tick
    pub pending_disconnect: u16,
}

impl GapState {
    pub const fn new() -> Self {
        Self {
            initialized: false,
            mode: AdvertisingMode::None,
            advertising: false,
            adv_type: None,
            interval: None,
            tx_power: None,
            pairing: PairingStatus(0),
            pending_disconnect: INVALID_CONN_HANDLE,
        }
    }

    /// Record a completed transition
    pub fn set_mode(&mut self, mode: AdvertisingMode, adv_type: AdvertisingType, interval: AdvertisingInterval) {
        self.mode = mode;
        self.adv_type = Some(adv_type);
        self.interval = Some(interval);
        self.advertising = true;
    }

    /// A transition that failed part-way leaves nothing valid on air
    pub fn set_aborted(&mut self) {
        self.mode = AdvertisingMode::None;
        self.adv_type = None;
        self.interval = None;
        self.advertising = false;
    }

    pub fn has_pending_disconnect(&self) -> bool {
        self.pending_disconnect != INVALID_CONN_HANDLE
    }
}

impl Default for GapState {
    fn default() -> Self {
        Self::new()
    }
}
