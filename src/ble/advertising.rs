//! BLE Advertising Controller
//!
//! Every mode change goes through [`transition`], which runs the same fixed
//! sequence against the stack:
//!
//! 1. stop advertising
//! 2. clear the payload
//! 3. set the advertising type
//! 4. set the interval
//! 5. flags record
//! 6. mode-specific frame
//! 7. timeout, when configured
//! 8. start advertising
//!
//! A failure part-way returns immediately with advertising stopped. There is no
//! rollback to the previous mode.

use super::eddystone;
use super::gap_state::AdvertisingMode;
use super::ibeacon::{self, IBeaconFrame};
use super::payload::{AdFlags, AdType, AdvertisingPayload};
use super::stack::BleStack;
use crate::config::{RadioConfig, CONNECTABLE_INTERVAL_MS};
use crate::error::RadioError;

/// Advertising PDU type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdvertisingType {
    ConnectableUndirected,
    NonConnectableUndirected,
}

/// Advertising interval, validated to the range the link layer allows
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdvertisingInterval(u16);

impl AdvertisingInterval {
    pub const MIN_MS: u16 = 20;
    pub const MAX_MS: u16 = 10240;
    pub const DEFAULT: AdvertisingInterval = AdvertisingInterval(CONNECTABLE_INTERVAL_MS);

    pub const fn from_millis(ms: u16) -> Result<Self, RadioError> {
        if ms < Self::MIN_MS || ms > Self::MAX_MS {
            return Err(RadioError::InvalidParameter);
        }
        Ok(AdvertisingInterval(ms))
    }

    pub const fn as_millis(self) -> u16 {
        self.0
    }

    /// Interval in 0.625 ms units
    pub const fn as_ticks(self) -> u32 {
        self.0 as u32 * 8 / 5
    }
}

/// Request to enter one advertising mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdvertisingIntent<'a> {
    /// General connectable advertising under `"<model> [<device_name>]"`
    Connectable { device_name: &'a str },
    EddystoneUrl {
        url: &'a str,
        calibrated_power: i8,
        connectable: bool,
        interval_ms: u16,
    },
    IBeacon {
        proximity_uuid: [u8; 16],
        major: u16,
        minor: u16,
        calibrated_power: i8,
        interval_ms: u16,
    },
}

impl<'a> AdvertisingIntent<'a> {
    pub fn mode(&self) -> AdvertisingMode {
        match self {
            AdvertisingIntent::Connectable { .. } => AdvertisingMode::Connectable,
            AdvertisingIntent::EddystoneUrl { .. } => AdvertisingMode::EddystoneUrl,
            AdvertisingIntent::IBeacon { .. } => AdvertisingMode::IBeacon,
        }
    }

    pub fn advertising_type(&self) -> AdvertisingType {
        match self {
            AdvertisingIntent::Connectable { .. }
            | AdvertisingIntent::EddystoneUrl {
                connectable: true, ..
            } => AdvertisingType::ConnectableUndirected,
            _ => AdvertisingType::NonConnectableUndirected,
        }
    }

    pub fn interval(&self, config: &RadioConfig) -> Result<AdvertisingInterval, RadioError> {
        let ms = match self {
            AdvertisingIntent::Connectable { .. } => config.connectable_interval_ms,
            AdvertisingIntent::EddystoneUrl { interval_ms, .. } | AdvertisingIntent::IBeacon { interval_ms, .. } => {
                *interval_ms
            }
        };
        AdvertisingInterval::from_millis(ms)
    }

    /// Parameter checks that need no encoding
    pub fn validate(&self) -> Result<(), RadioError> {
        match self {
            AdvertisingIntent::EddystoneUrl {
                url, calibrated_power, ..
            } => eddystone::validate(url, *calibrated_power),
            // names are bounded by the payload budget alone
            AdvertisingIntent::Connectable { .. } | AdvertisingIntent::IBeacon { .. } => Ok(()),
        }
    }
}

/// Flags every mode starts with
pub fn baseline_flags(config: &RadioConfig) -> AdFlags {
    if config.whitelist_only {
        AdFlags::BR_EDR_NOT_SUPPORTED
    } else {
        AdFlags::BR_EDR_NOT_SUPPORTED | AdFlags::LE_GENERAL_DISCOVERABLE
    }
}

/// Append the mode-specific frame for `intent`.
pub fn push_frame(payload: &mut AdvertisingPayload, config: &RadioConfig, intent: &AdvertisingIntent<'_>) -> Result<(), RadioError> {
    match *intent {
        AdvertisingIntent::Connectable { device_name } => {
            payload.push_parts(
                AdType::COMPLETE_LOCAL_NAME,
                &[config.model_name.as_bytes(), b" [", device_name.as_bytes(), b"]"],
            )?;
            Ok(())
        }
        AdvertisingIntent::EddystoneUrl {
            url, calibrated_power, ..
        } => eddystone::push_url_frame(payload, url, calibrated_power),
        AdvertisingIntent::IBeacon {
            proximity_uuid,
            major,
            minor,
            calibrated_power,
            interval_ms: _,
        } => ibeacon::push_frame(
            payload,
            &IBeaconFrame {
                proximity_uuid,
                major,
                minor,
                calibrated_power,
            },
        ),
    }
}

/// Complete payload (flags + frame) for `intent`, without touching the stack
pub fn build_payload(config: &RadioConfig, intent: &AdvertisingIntent<'_>) -> Result<AdvertisingPayload, RadioError> {
    let mut payload = AdvertisingPayload::new();
    payload.push_flags(baseline_flags(config))?;
    push_frame(&mut payload, config, intent)?;
    Ok(payload)
}

/// Enact a mode change on the stack.
///
/// Parameters are validated before the first stack call. Returns the mode,
/// type and interval now on air.
pub fn transition<S: BleStack>(
    stack: &mut S,
    config: &RadioConfig,
    intent: &AdvertisingIntent<'_>,
) -> Result<(AdvertisingMode, AdvertisingType, AdvertisingInterval), RadioError> {
    intent.validate()?;
    let interval = intent.interval(config)?;
    let adv_type = intent.advertising_type();

    debug!("ADV: transition to {:?}, {}ms", intent.mode(), interval.as_millis());

    // 1-2
    stack.stop_advertising()?;
    stack.clear_advertising_payload();

    // 3-4
    stack.set_advertising_type(adv_type);
    stack.set_advertising_interval(interval);

    // 5-6
    let mut payload = AdvertisingPayload::new();
    payload.push_flags(baseline_flags(config))?;
    if let Err(e) = push_frame(&mut payload, config, intent) {
        warn!("ADV: frame for {:?} rejected: {:?}", intent.mode(), e);
        return Err(e);
    }
    for record in payload.records() {
        stack.accumulate_advertising_payload(record.ad_type, record.data)?;
    }

    // 7
    if config.advertising_timeout_seconds > 0 {
        stack.set_advertising_timeout(config.advertising_timeout_seconds)?;
    }

    // 8
    stack.start_advertising()?;

    Ok((intent.mode(), adv_type, interval))
}
