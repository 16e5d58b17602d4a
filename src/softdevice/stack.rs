//! SoftDevice Stack Adapter
//!
//! Stages advertising parameters the way the radio session issues them and
//! hands a complete snapshot to the advertising task on `start_advertising`.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;
use nrf_softdevice::ble::TxPower;

use crate::ble::advertising::{AdvertisingInterval, AdvertisingType};
use crate::ble::payload::{AdType, MAX_ADV_DATA_LEN};
use crate::ble::stack::{BleStack, StackStatus};
use crate::config::MAX_ADVERTISING_TIMEOUT_SECONDS;

use super::security;

/// Everything the advertising task needs to (re)start advertising
#[derive(Clone)]
pub struct AdvSnapshot {
    pub adv_type: AdvertisingType,
    /// 0.625 ms units
    pub interval: u32,
    /// 10 ms units, `None` = until stopped
    pub timeout: Option<u16>,
    pub tx_power: TxPower,
    pub adv_data: Vec<u8, MAX_ADV_DATA_LEN>,
}

/// Commands for the advertising task
pub enum AdvCommand {
    Start(AdvSnapshot),
    Stop,
    Disconnect(u16),
}

/// Command channel drained by the advertising task
pub(crate) static ADV_COMMANDS: Channel<CriticalSectionRawMutex, AdvCommand, 8> = Channel::new();

fn post(cmd: AdvCommand) -> Result<(), StackStatus> {
    ADV_COMMANDS.try_send(cmd).map_err(|_| {
        warn!("SD: advertising command queue full");
        StackStatus::BUSY
    })
}

/// Map a power table entry onto a level the radio supports.
///
/// The nRF52 has no -30 dBm setting.
pub fn tx_power_from_dbm(dbm: i8) -> Option<TxPower> {
    let power = match dbm {
        -20 => TxPower::Minus20dBm,
        -16 => TxPower::Minus16dBm,
        -12 => TxPower::Minus12dBm,
        -8 => TxPower::Minus8dBm,
        -4 => TxPower::Minus4dBm,
        0 => TxPower::ZerodBm,
        4 => TxPower::Plus4dBm,
        _ => return None,
    };
    Some(power)
}

pub struct SoftdeviceStack {
    adv_type: AdvertisingType,
    interval: AdvertisingInterval,
    timeout_seconds: u16,
    tx_power: TxPower,
    adv_data: Vec<u8, MAX_ADV_DATA_LEN>,
    advertising: bool,
}

impl SoftdeviceStack {
    pub fn new() -> Self {
        Self {
            adv_type: AdvertisingType::ConnectableUndirected,
            interval: AdvertisingInterval::DEFAULT,
            timeout_seconds: 0,
            tx_power: TxPower::ZerodBm,
            adv_data: Vec::new(),
            advertising: false,
        }
    }

    pub fn bonding_enabled(&self) -> bool {
        security::bonding_enabled()
    }

    /// Timeout handed to the next advertising set, 10 ms units
    pub fn advertising_timeout(&self) -> Option<u16> {
        match self.timeout_seconds {
            0 => None,
            // bounded by set_advertising_timeout, so no overflow
            secs => Some(secs * 100),
        }
    }

    pub fn adv_data(&self) -> &[u8] {
        &self.adv_data
    }

    fn snapshot(&self) -> AdvSnapshot {
        AdvSnapshot {
            adv_type: self.adv_type,
            interval: self.interval.as_ticks(),
            timeout: self.advertising_timeout(),
            tx_power: self.tx_power,
            adv_data: self.adv_data.clone(),
        }
    }
}

impl Default for SoftdeviceStack {
    fn default() -> Self {
        Self::new()
    }
}

impl BleStack for SoftdeviceStack {
    fn init(&mut self, bonding_enabled: bool) -> Result<(), StackStatus> {
        // Softdevice::enable has already run by the time the session exists
        security::set_bonding_enabled(bonding_enabled);
        debug!("SD: stack ready, bonding={}", bonding_enabled);
        Ok(())
    }

    fn set_radio_cpu_mutex(&mut self, enabled: bool) -> Result<(), StackStatus> {
        // S140 reserves interrupt priorities 0, 1 and 4 for radio timing itself
        debug!("SD: radio/cpu mutex {} (always on for S140)", enabled);
        Ok(())
    }

    fn set_tx_power(&mut self, dbm: i8) -> Result<(), StackStatus> {
        let power = tx_power_from_dbm(dbm).ok_or(StackStatus::NOT_SUPPORTED)?;
        self.tx_power = power;
        if self.advertising {
            post(AdvCommand::Start(self.snapshot()))?;
        }
        Ok(())
    }

    fn start_advertising(&mut self) -> Result<(), StackStatus> {
        post(AdvCommand::Start(self.snapshot()))?;
        self.advertising = true;
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), StackStatus> {
        if self.advertising {
            post(AdvCommand::Stop)?;
            self.advertising = false;
        }
        Ok(())
    }

    fn set_advertising_timeout(&mut self, seconds: u16) -> Result<(), StackStatus> {
        if seconds > MAX_ADVERTISING_TIMEOUT_SECONDS {
            return Err(StackStatus::INVALID_PARAM);
        }
        self.timeout_seconds = seconds;
        Ok(())
    }

    fn set_advertising_type(&mut self, adv_type: AdvertisingType) {
        self.adv_type = adv_type;
    }

    fn set_advertising_interval(&mut self, interval: AdvertisingInterval) {
        self.interval = interval;
    }

    fn clear_advertising_payload(&mut self) {
        self.adv_data.clear();
    }

    fn accumulate_advertising_payload(&mut self, ad_type: AdType, data: &[u8]) -> Result<(), StackStatus> {
        if self.adv_data.len() + 2 + data.len() > MAX_ADV_DATA_LEN {
            return Err(StackStatus::NO_MEM);
        }
        self.adv_data
            .extend_from_slice(&[data.len() as u8 + 1, ad_type.to_u8()])
            .map_err(|_| StackStatus::NO_MEM)?;
        self.adv_data.extend_from_slice(data).map_err(|_| StackStatus::NO_MEM)
    }

    fn disconnect(&mut self, conn_handle: u16) -> Result<(), StackStatus> {
        post(AdvCommand::Disconnect(conn_handle))
    }
}
