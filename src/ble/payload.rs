//! Advertising Payload
//!
//! Legacy advertising data is a sequence of `[len, type, data..]` records that
//! must fit in 31 bytes. [`AdvertisingPayload`] enforces that budget on every
//! append and never truncates.

use heapless::Vec;

/// Maximum advertising data length (BLE specification, legacy advertising)
pub const MAX_ADV_DATA_LEN: usize = 31;

/// AD structure type code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdType(u8);

impl AdType {
    pub const FLAGS: AdType = AdType(0x01);
    pub const COMPLETE_16_SERVICE_LIST: AdType = AdType(0x03);
    pub const SHORT_NAME: AdType = AdType(0x08);
    pub const COMPLETE_LOCAL_NAME: AdType = AdType(0x09);
    pub const SERVICE_DATA_16: AdType = AdType(0x16);
    pub const MANUFACTURER_SPECIFIC_DATA: AdType = AdType(0xff);

    pub const fn from_u8(value: u8) -> Self {
        AdType(value)
    }

    pub const fn to_u8(self) -> u8 {
        self.0
    }
}

/// Flags AD structure bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdFlags(u8);

impl AdFlags {
    pub const LE_LIMITED_DISCOVERABLE: AdFlags = AdFlags(0x01);
    pub const LE_GENERAL_DISCOVERABLE: AdFlags = AdFlags(0x02);
    pub const BR_EDR_NOT_SUPPORTED: AdFlags = AdFlags(0x04);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: AdFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl core::ops::BitOr for AdFlags {
    type Output = AdFlags;

    fn bitor(self, rhs: AdFlags) -> AdFlags {
        AdFlags(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadError {
    /// `expected` bytes would have been needed
    Oversize { expected: usize },
}

/// One decoded AD structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdRecord<'a> {
    pub ad_type: AdType,
    pub data: &'a [u8],
}

/// Advertising data buffer, rebuilt from scratch for every mode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertisingPayload {
    buf: Vec<u8, MAX_ADV_DATA_LEN>,
}

impl AdvertisingPayload {
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes left before the 31 byte budget is exhausted
    pub fn remaining(&self) -> usize {
        MAX_ADV_DATA_LEN - self.buf.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append one record; the length byte is computed and prepended.
    pub fn push(&mut self, ad_type: AdType, data: &[u8]) -> Result<(), PayloadError> {
        self.push_parts(ad_type, &[data])
    }

    /// Append one record whose data is the concatenation of `parts`.
    ///
    /// Nothing is written if the record does not fit.
    pub fn push_parts(&mut self, ad_type: AdType, parts: &[&[u8]]) -> Result<(), PayloadError> {
        let data_len: usize = parts.iter().map(|p| p.len()).sum();
        let expected = self.buf.len() + 2 + data_len;
        // the length byte also counts the type byte
        if expected > MAX_ADV_DATA_LEN || data_len + 1 > u8::MAX as usize {
            return Err(PayloadError::Oversize { expected });
        }

        let header = [(data_len + 1) as u8, ad_type.to_u8()];
        for chunk in core::iter::once(&header[..]).chain(parts.iter().copied()) {
            self.buf
                .extend_from_slice(chunk)
                .map_err(|_| PayloadError::Oversize { expected })?;
        }
        Ok(())
    }

    pub fn push_flags(&mut self, flags: AdFlags) -> Result<(), PayloadError> {
        self.push(AdType::FLAGS, &[flags.bits()])
    }

    pub fn records(&self) -> Records<'_> {
        Records::new(&self.buf)
    }
}

impl AsRef<[u8]> for AdvertisingPayload {
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}

/// Iterator over the AD structures of raw advertising data.
///
/// Stops at the first zero-length or truncated record.
pub struct Records<'a> {
    data: &'a [u8],
}

impl<'a> Records<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = AdRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (&len, rest) = self.data.split_first()?;
        let len = len as usize;
        if len == 0 || rest.len() < len {
            self.data = &[];
            return None;
        }

        let (record, tail) = rest.split_at(len);
        self.data = tail;
        Some(AdRecord {
            ad_type: AdType::from_u8(record[0]),
            data: &record[1..],
        })
    }
}
