//! Common test utilities for host tests
//!
//! - `MockStack`: records every command the radio session issues and keeps the
//!   advertising payload the way a real stack would
//! - `MockServices`: records GATT service registration

#![allow(dead_code)]

use microbit_ble_radio::ble::payload::{AdType, MAX_ADV_DATA_LEN};
use microbit_ble_radio::{
    AdvertisingInterval, AdvertisingType, BleStack, DeviceInformation, GattServices, RadioConfig, RadioSession,
    StackStatus,
};

/// One command as seen by the stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Init(bool),
    CpuMutex(bool),
    TxPower(i8),
    Start,
    Stop,
    Timeout(u16),
    Type(AdvertisingType),
    Interval(AdvertisingInterval),
    ClearPayload,
    Accumulate(AdType, Vec<u8>),
    Disconnect(u16),
}

#[derive(Debug, Default)]
pub struct MockStack {
    pub calls: Vec<Call>,
    /// Raw advertising data as accumulated since the last clear
    pub payload: Vec<u8>,
    pub advertising: bool,
    pub adv_type: Option<AdvertisingType>,
    pub interval: Option<AdvertisingInterval>,
    pub tx_power: Option<i8>,
    /// dBm values the radio refuses
    pub rejected_tx_power: Vec<i8>,
    pub fail_init: Option<StackStatus>,
    /// Refuse the next start only
    pub fail_start: Option<StackStatus>,
}

impl MockStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// A radio without a -30 dBm setting
    pub fn nrf52() -> Self {
        Self {
            rejected_tx_power: vec![-30],
            ..Self::default()
        }
    }

    pub fn calls_since(&self, mark: usize) -> &[Call] {
        &self.calls[mark..]
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

impl BleStack for MockStack {
    fn init(&mut self, bonding_enabled: bool) -> Result<(), StackStatus> {
        self.calls.push(Call::Init(bonding_enabled));
        match self.fail_init {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }

    fn set_radio_cpu_mutex(&mut self, enabled: bool) -> Result<(), StackStatus> {
        self.calls.push(Call::CpuMutex(enabled));
        Ok(())
    }

    fn set_tx_power(&mut self, dbm: i8) -> Result<(), StackStatus> {
        self.calls.push(Call::TxPower(dbm));
        if self.rejected_tx_power.contains(&dbm) {
            return Err(StackStatus::NOT_SUPPORTED);
        }
        self.tx_power = Some(dbm);
        Ok(())
    }

    fn start_advertising(&mut self) -> Result<(), StackStatus> {
        self.calls.push(Call::Start);
        if let Some(status) = self.fail_start.take() {
            return Err(status);
        }
        self.advertising = true;
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), StackStatus> {
        self.calls.push(Call::Stop);
        self.advertising = false;
        Ok(())
    }

    fn set_advertising_timeout(&mut self, seconds: u16) -> Result<(), StackStatus> {
        self.calls.push(Call::Timeout(seconds));
        Ok(())
    }

    fn set_advertising_type(&mut self, adv_type: AdvertisingType) {
        self.calls.push(Call::Type(adv_type));
        self.adv_type = Some(adv_type);
    }

    fn set_advertising_interval(&mut self, interval: AdvertisingInterval) {
        self.calls.push(Call::Interval(interval));
        self.interval = Some(interval);
    }

    fn clear_advertising_payload(&mut self) {
        self.calls.push(Call::ClearPayload);
        self.payload.clear();
    }

    fn accumulate_advertising_payload(&mut self, ad_type: AdType, data: &[u8]) -> Result<(), StackStatus> {
        self.calls.push(Call::Accumulate(ad_type, data.to_vec()));
        if self.payload.len() + 2 + data.len() > MAX_ADV_DATA_LEN {
            return Err(StackStatus::NO_MEM);
        }
        self.payload.push(data.len() as u8 + 1);
        self.payload.push(ad_type.to_u8());
        self.payload.extend_from_slice(data);
        Ok(())
    }

    fn disconnect(&mut self, conn_handle: u16) -> Result<(), StackStatus> {
        self.calls.push(Call::Disconnect(conn_handle));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MockServices {
    pub registered: Vec<&'static str>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub firmware_revision: Option<String>,
    pub fail_dfu: bool,
    pub fail_event: bool,
}

impl GattServices for MockServices {
    fn register_device_information(&mut self, info: &DeviceInformation<'_>) -> Result<(), StackStatus> {
        self.registered.push("device_information");
        self.model = Some(info.model.to_string());
        self.serial_number = Some(info.serial_number.to_string());
        self.firmware_revision = Some(info.firmware_revision.to_string());
        Ok(())
    }

    fn register_dfu_service(&mut self) -> Result<(), StackStatus> {
        if self.fail_dfu {
            return Err(StackStatus::NO_MEM);
        }
        self.registered.push("dfu");
        Ok(())
    }

    fn register_event_service(&mut self) -> Result<(), StackStatus> {
        if self.fail_event {
            return Err(StackStatus::NO_MEM);
        }
        self.registered.push("event");
        Ok(())
    }
}

pub const DEVICE_NAME: &str = "zuvep";
pub const SERIAL: &str = "1234567890";

/// Session that has been through `initialize` with the default config
pub fn initialized_session() -> RadioSession<MockStack> {
    initialized_session_with(RadioConfig::default())
}

pub fn initialized_session_with(config: RadioConfig) -> RadioSession<MockStack> {
    let mut session = RadioSession::new(MockStack::nrf52(), config);
    session
        .initialize(DEVICE_NAME, SERIAL, &mut MockServices::default())
        .expect("initialize");
    session
}

/// Records of a raw advertising payload as `(type, data)` pairs
pub fn records(payload: &[u8]) -> Vec<(u8, Vec<u8>)> {
    let mut out = Vec::new();
    let mut rest = payload;
    while let [len, ad_type, tail @ ..] = rest {
        let data_len = *len as usize - 1;
        out.push((*ad_type, tail[..data_len].to_vec()));
        rest = &tail[data_len..];
    }
    out
}
