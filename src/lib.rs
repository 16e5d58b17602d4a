#![cfg_attr(not(test), no_std)]

//! micro:bit BLE Radio Library
//!
//! Advertising state management for the micro:bit radio, organized into
//! clear architectural layers:
//!
//! - `ble`: power table, advertising payloads, mode controller and the
//!   radio session that owns the stack handle
//! - `config`: startup configuration resolved once and handed to the session
//! - `error`: error taxonomy shared by every radio operation
//! - `softdevice`: nRF52833 S140 backend (`firmware` feature)

// This must go first so the logging macros are visible to every module.
mod fmt;

pub mod ble;
pub mod config;
pub mod error;

#[cfg(feature = "firmware")]
pub mod softdevice;

pub use ble::advertising::{AdvertisingIntent, AdvertisingInterval, AdvertisingType};
pub use ble::gap_state::{AdvertisingMode, PairingStatus};
pub use ble::power::PowerLevel;
pub use ble::session::{PairingEvent, RadioSession};
pub use ble::stack::{BleStack, GattServices, StackStatus};
pub use config::{DeviceInformation, RadioConfig};
pub use error::RadioError;
