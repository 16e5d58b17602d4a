//! External Stack Interfaces
//!
//! The radio session only issues commands through these traits and reads the
//! status codes they return. The BLE stack owns its advertising buffers; the
//! session never touches them directly.

use super::advertising::{AdvertisingInterval, AdvertisingType};
use super::payload::AdType;
use crate::config::DeviceInformation;

/// Raw status code reported by the stack (nRF error code space)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StackStatus(pub u32);

impl StackStatus {
    pub const INTERNAL: StackStatus = StackStatus(0x03);
    pub const NOT_SUPPORTED: StackStatus = StackStatus(0x06);
    pub const INVALID_PARAM: StackStatus = StackStatus(0x07);
    pub const INVALID_STATE: StackStatus = StackStatus(0x08);
    pub const NO_MEM: StackStatus = StackStatus(0x04);
    pub const BUSY: StackStatus = StackStatus(0x11);
}

/// Commands the radio session issues to the BLE stack.
///
/// Every call is expected to complete synchronously and quickly.
pub trait BleStack {
    /// Bring the stack up; called once per process lifetime.
    fn init(&mut self, bonding_enabled: bool) -> Result<(), StackStatus>;

    /// Keep the CPU away from time-critical radio events.
    fn set_radio_cpu_mutex(&mut self, enabled: bool) -> Result<(), StackStatus>;

    fn set_tx_power(&mut self, dbm: i8) -> Result<(), StackStatus>;

    fn start_advertising(&mut self) -> Result<(), StackStatus>;

    /// Must be idempotent.
    fn stop_advertising(&mut self) -> Result<(), StackStatus>;

    fn set_advertising_timeout(&mut self, seconds: u16) -> Result<(), StackStatus>;

    fn set_advertising_type(&mut self, adv_type: AdvertisingType);

    fn set_advertising_interval(&mut self, interval: AdvertisingInterval);

    fn clear_advertising_payload(&mut self);

    fn accumulate_advertising_payload(&mut self, ad_type: AdType, data: &[u8]) -> Result<(), StackStatus>;

    fn disconnect(&mut self, conn_handle: u16) -> Result<(), StackStatus>;
}

/// Registration of the GATT services that ride along with the radio.
///
/// Implementors own whatever those services need (e.g. the event bus the
/// event service bridges onto).
pub trait GattServices {
    fn register_device_information(&mut self, info: &DeviceInformation<'_>) -> Result<(), StackStatus>;

    fn register_dfu_service(&mut self) -> Result<(), StackStatus>;

    fn register_event_service(&mut self) -> Result<(), StackStatus>;
}
