//! iBeacon Frames
//!
//! Carried in a single manufacturer specific data record:
//! company 0x004C (little-endian), beacon type 0x02, remaining length 0x15,
//! 16 byte proximity UUID, major and minor (big-endian), measured power.

use super::payload::{AdType, AdvertisingPayload};
use crate::error::RadioError;

/// Apple company identifier, little-endian on air
pub const COMPANY_ID: u16 = 0x004C;

pub const BEACON_TYPE: u8 = 0x02;

/// Bytes following the type byte: UUID + major + minor + power
pub const BEACON_DATA_LEN: u8 = 0x15;

/// Manufacturer data length (company id through measured power)
pub const FRAME_LEN: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IBeaconFrame {
    pub proximity_uuid: [u8; 16],
    pub major: u16,
    pub minor: u16,
    pub calibrated_power: i8,
}

impl IBeaconFrame {
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut frame = [0u8; FRAME_LEN];
        frame[0..2].copy_from_slice(&COMPANY_ID.to_le_bytes());
        frame[2] = BEACON_TYPE;
        frame[3] = BEACON_DATA_LEN;
        frame[4..20].copy_from_slice(&self.proximity_uuid);
        frame[20..22].copy_from_slice(&self.major.to_be_bytes());
        frame[22..24].copy_from_slice(&self.minor.to_be_bytes());
        frame[24] = self.calibrated_power as u8;
        frame
    }

    /// Parse manufacturer specific data the way a scanner would.
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() != FRAME_LEN
            || data[0..2] != COMPANY_ID.to_le_bytes()
            || data[2] != BEACON_TYPE
            || data[3] != BEACON_DATA_LEN
        {
            return None;
        }

        let mut proximity_uuid = [0u8; 16];
        proximity_uuid.copy_from_slice(&data[4..20]);
        Some(Self {
            proximity_uuid,
            major: u16::from_be_bytes([data[20], data[21]]),
            minor: u16::from_be_bytes([data[22], data[23]]),
            calibrated_power: data[24] as i8,
        })
    }
}

/// Append the iBeacon record to `payload`.
///
/// Fixed size: after the flags record there is always room.
pub fn push_frame(payload: &mut AdvertisingPayload, frame: &IBeaconFrame) -> Result<(), RadioError> {
    payload.push(AdType::MANUFACTURER_SPECIFIC_DATA, &frame.encode())?;
    Ok(())
}
