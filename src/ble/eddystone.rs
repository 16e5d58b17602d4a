//! Eddystone URL Frames
//!
//! Frame layout (service data for UUID 0xFEAA):
//!
//! | byte | field                                   |
//! |------|-----------------------------------------|
//! | 0-1  | Eddystone service UUID, little-endian   |
//! | 2    | frame type (0x10, URL)                  |
//! | 3    | calibrated TX power at 0m, two's compl. |
//! | 4    | URL scheme code                         |
//! | 5..  | encoded URL                             |
//!
//! The same UUID is also listed in a Complete 16-bit Service UUID record so
//! that scanners pick the frame up.

use heapless::Vec;

use super::payload::{AdType, AdvertisingPayload, PayloadError, MAX_ADV_DATA_LEN};
use crate::error::RadioError;

/// Eddystone service UUID as it appears on air
pub const EDDYSTONE_UUID: [u8; 2] = [0xAA, 0xFE];

pub const URL_FRAME_TYPE: u8 = 0x10;

/// Calibrated power range accepted by the Eddystone format (dBm)
pub const MIN_CALIBRATED_POWER: i8 = -100;
pub const MAX_CALIBRATED_POWER: i8 = 20;

/// Scheme prefixes, index = on-air code
pub const URL_SCHEMES: [&str; 4] = ["http://www.", "https://www.", "http://", "https://"];

/// Expansion codes, index = on-air code
pub const URL_EXPANSIONS: [&str; 14] = [
    ".com/", ".org/", ".edu/", ".net/", ".info/", ".biz/", ".gov/", ".com", ".org", ".edu", ".net", ".info", ".biz",
    ".gov",
];

/// Checks what can be checked without encoding: the URL is non-empty
/// printable ASCII and the power is inside the Eddystone range.
pub fn validate(url: &str, calibrated_power: i8) -> Result<(), RadioError> {
    if url.is_empty() || !url.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(RadioError::InvalidParameter);
    }
    if !(MIN_CALIBRATED_POWER..=MAX_CALIBRATED_POWER).contains(&calibrated_power) {
        return Err(RadioError::InvalidParameter);
    }
    Ok(())
}

/// Longest entry of `table` that prefixes `input`, as (code, length)
fn longest_match(table: &[&str], input: &[u8]) -> Option<(u8, usize)> {
    table
        .iter()
        .enumerate()
        .filter(|(_, entry)| input.starts_with(entry.as_bytes()))
        .max_by_key(|(_, entry)| entry.len())
        .map(|(code, entry)| (code as u8, entry.len()))
}

/// Compress a URL into its Eddystone form.
///
/// A recognised scheme becomes its code byte; URLs with no recognised scheme
/// are carried literally. Known expansions are substituted wherever they occur.
pub fn encode_url(url: &str) -> Result<Vec<u8, MAX_ADV_DATA_LEN>, PayloadError> {
    let mut encoded = Vec::new();
    let mut rest = url.as_bytes();
    let mut consumed = 0;

    let push = |encoded: &mut Vec<u8, MAX_ADV_DATA_LEN>, byte: u8, consumed: usize| {
        encoded.push(byte).map_err(|_| PayloadError::Oversize {
            expected: encoded.len() + 1 + url.len() - consumed,
        })
    };

    if let Some((code, len)) = longest_match(&URL_SCHEMES, rest) {
        push(&mut encoded, code, consumed)?;
        rest = &rest[len..];
        consumed += len;
    }

    while let Some(&byte) = rest.first() {
        match longest_match(&URL_EXPANSIONS, rest) {
            Some((code, len)) => {
                push(&mut encoded, code, consumed)?;
                rest = &rest[len..];
                consumed += len;
            }
            None => {
                push(&mut encoded, byte, consumed)?;
                rest = &rest[1..];
                consumed += 1;
            }
        }
    }

    Ok(encoded)
}

/// Append the Eddystone URL records to `payload`.
pub fn push_url_frame(payload: &mut AdvertisingPayload, url: &str, calibrated_power: i8) -> Result<(), RadioError> {
    let encoded = encode_url(url)?;

    // both records, so a URL that does not fit leaves the payload untouched
    let expected = payload.len() + 2 + EDDYSTONE_UUID.len() + 2 + EDDYSTONE_UUID.len() + 2 + encoded.len();
    if expected > MAX_ADV_DATA_LEN {
        return Err(PayloadError::Oversize { expected }.into());
    }

    payload.push(AdType::COMPLETE_16_SERVICE_LIST, &EDDYSTONE_UUID)?;
    payload.push_parts(
        AdType::SERVICE_DATA_16,
        &[
            &EDDYSTONE_UUID,
            &[URL_FRAME_TYPE, calibrated_power as u8],
            &encoded,
        ],
    )?;
    Ok(())
}
