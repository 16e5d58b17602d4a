//! BLE Radio Implementation
//!
//! Contains the advertising side of the micro:bit radio: the transmit power
//! table, payload encoders, the mode controller and the radio session.
//! Service registration and the stack itself sit behind the traits in `stack`.

pub mod advertising;
pub mod eddystone;
pub mod gap_state;
pub mod ibeacon;
pub mod payload;
pub mod power;
pub mod session;
pub mod stack;
