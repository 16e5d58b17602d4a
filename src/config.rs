//! Radio Configuration
//!
//! Feature selection that the firmware resolves once at startup and hands to
//! [`RadioSession::new`](crate::RadioSession::new).

use crate::ble::power::PowerLevel;
use crate::error::RadioError;

/// Model string used in the framed local name and the device information service
pub const MODEL_NAME: &str = "BBC micro:bit";

/// Default interval for connectable advertising (ms)
pub const CONNECTABLE_INTERVAL_MS: u16 = 200;

/// Default interval for Eddystone URL frames (ms)
pub const EDDYSTONE_INTERVAL_MS: u16 = 400;

/// Default calibrated power for beacon frames (~10m)
pub const DEFAULT_CALIBRATED_POWER: i8 = -16;

/// Power index applied by `initialize`, 0 dBm on the power table
pub const DEFAULT_TX_POWER_INDEX: u8 = 6;

/// Longest advertising timeout the stack accepts, 65535 units of 10 ms
pub const MAX_ADVERTISING_TIMEOUT_SECONDS: u16 = 655;

/// Radio configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioConfig {
    pub model_name: &'static str,
    pub bonding_enabled: bool,
    /// Advertise to whitelisted peers only (drops the general discoverable flag)
    pub whitelist_only: bool,
    /// 0 = advertise until told otherwise
    pub advertising_timeout_seconds: u16,
    pub connectable_interval_ms: u16,
    pub initial_tx_power: PowerLevel,
    /// Keep the CPU away from in-progress radio events
    pub radio_cpu_mutex: bool,
    pub dfu_service_enabled: bool,
    pub device_info_service_enabled: bool,
    pub event_service_enabled: bool,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            model_name: MODEL_NAME,
            bonding_enabled: true,
            whitelist_only: false,
            advertising_timeout_seconds: 0,
            connectable_interval_ms: CONNECTABLE_INTERVAL_MS,
            initial_tx_power: PowerLevel::DEFAULT,
            radio_cpu_mutex: true,
            dfu_service_enabled: true,
            device_info_service_enabled: true,
            event_service_enabled: true,
        }
    }
}

impl RadioConfig {
    /// Reject values the stack cannot honour before anything is started.
    pub fn validate(&self) -> Result<(), RadioError> {
        if self.advertising_timeout_seconds > MAX_ADVERTISING_TIMEOUT_SECONDS {
            return Err(RadioError::InvalidParameter);
        }
        Ok(())
    }
}

/// Strings exposed by the device information service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceInformation<'a> {
    pub manufacturer: Option<&'a str>,
    pub model: &'a str,
    pub serial_number: &'a str,
    pub hardware_revision: Option<&'a str>,
    pub firmware_revision: &'a str,
    pub software_revision: Option<&'a str>,
}

impl<'a> DeviceInformation<'a> {
    pub fn new(model: &'a str, serial_number: &'a str) -> Self {
        Self {
            manufacturer: None,
            model,
            serial_number,
            hardware_revision: None,
            firmware_revision: env!("CARGO_PKG_VERSION"),
            software_revision: None,
        }
    }
}

/// Decimal digits of the largest device serial
pub const SERIAL_NUMBER_LEN: usize = 10;

/// Decimal form of the device serial, as shown by the device information service
pub fn serial_number(serial: u32) -> heapless::String<SERIAL_NUMBER_LEN> {
    use core::fmt::Write as _;

    let mut out = heapless::String::new();
    // u32::MAX has exactly SERIAL_NUMBER_LEN digits
    let _ = core::write!(out, "{}", serial);
    out
}

/// Length of the name derived from the device serial
pub const FRIENDLY_NAME_LEN: usize = 5;

const NAME_CODEBOOK: [[u8; 5]; FRIENDLY_NAME_LEN] = [
    *b"zvgpt",
    *b"uoiea",
    *b"zvgpt",
    *b"uoiea",
    *b"zvgpt",
];

/// Pronounceable five letter name derived from the device serial number.
///
/// Each letter encodes one base-5 digit of the serial, least significant
/// digit last, alternating consonants and vowels.
pub fn friendly_name(serial: u32) -> heapless::String<FRIENDLY_NAME_LEN> {
    let mut letters = [0u8; FRIENDLY_NAME_LEN];
    let mut n = serial;
    for (i, code) in NAME_CODEBOOK.iter().enumerate() {
        letters[FRIENDLY_NAME_LEN - 1 - i] = code[(n % 5) as usize];
        n /= 5;
    }

    let mut name = heapless::String::new();
    for &letter in &letters {
        // codebook is ASCII and the capacity matches
        let _ = name.push(letter as char);
    }
    name
}
