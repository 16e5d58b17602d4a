//! nRF52833 S140 Backend
//!
//! Implements the stack traits on top of nrf-softdevice. The SoftDevice API is
//! async and owns advertising for as long as a future is polled, so
//! [`SoftdeviceStack`] only stages parameters and posts commands; the
//! [`advertising_task`] embassy task is the one place that talks to the radio.
//! The command channel between them and the pairing event queue in
//! [`security`] are the only global state in the crate.

pub mod security;
pub mod services;
pub mod stack;
pub mod task;

pub use security::{forward_pairing_events, RADIO_SECURITY};
pub use services::{RadioServer, SoftdeviceServices};
pub use stack::{tx_power_from_dbm, SoftdeviceStack};
pub use task::advertising_task;
