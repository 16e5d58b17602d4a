//! Radio Session
//!
//! Single owner of the BLE stack handle and the only place advertising state
//! changes. Construct one at startup and pass it by reference to whatever
//! needs the radio; the type is neither `Clone` nor `Copy`.
//!
//! Every operation takes `&mut self`, so two mode changes (or a mode change
//! and a power change) can never interleave on the shared radio
//! configuration.

use heapless::String;

use super::advertising::{self, AdvertisingIntent};
use super::gap_state::{
    AdvertisingMode, GapState, PairingStatus, INVALID_CONN_HANDLE, MAX_DEVICE_NAME_LEN, PAIR_COMPLETE,
    PAIR_PASSCODE, PAIR_REQUEST, PAIR_SUCCESSFUL,
};
use super::power::PowerLevel;
use super::stack::{BleStack, GattServices};
use crate::config::{DeviceInformation, RadioConfig};
use crate::error::RadioError;

// Services registered so far, so a retried `initialize` does not add them twice
const SERVICE_DFU: u8 = 0x01;
const SERVICE_DEVICE_INFO: u8 = 0x02;
const SERVICE_EVENT: u8 = 0x04;

/// Pairing progress reported by the stack's security layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PairingEvent {
    Requested,
    PasscodeDisplayed,
    Complete { conn_handle: u16, success: bool },
}

pub struct RadioSession<S: BleStack> {
    stack: S,
    config: RadioConfig,
    device_name: String<MAX_DEVICE_NAME_LEN>,
    state: GapState,
    /// `stack.init` has succeeded; it is never repeated
    stack_up: bool,
    registered_services: u8,
}

impl<S: BleStack> RadioSession<S> {
    /// Take ownership of the stack. Nothing is sent to it until `initialize`.
    pub fn new(stack: S, config: RadioConfig) -> Self {
        Self {
            stack,
            config,
            device_name: String::new(),
            state: GapState::new(),
            stack_up: false,
            registered_services: 0,
        }
    }

    /// Bring the radio up and start connectable advertising.
    ///
    /// Succeeds once per session; later calls return `AlreadyInitialized`
    /// without touching the stack. A local name that does not fit the
    /// advertising payload, or a configuration the stack cannot honour, is
    /// rejected before the stack is started. If a later step fails the
    /// session stays uninitialized and the call can be retried; the stack
    /// itself is only started once.
    pub fn initialize<G: GattServices>(
        &mut self,
        device_name: &str,
        serial_number: &str,
        services: &mut G,
    ) -> Result<(), RadioError> {
        if self.state.initialized {
            warn!("RADIO: initialize called twice");
            return Err(RadioError::AlreadyInitialized);
        }

        self.config.validate()?;
        let intent = AdvertisingIntent::Connectable { device_name };
        advertising::build_payload(&self.config, &intent)?;
        let name = String::try_from(device_name).map_err(|_| RadioError::InvalidParameter)?;

        if !self.stack_up {
            info!("RADIO: starting stack for {=str}", device_name);
            self.stack.init(self.config.bonding_enabled)?;
            self.stack_up = true;
        }
        self.device_name = name;

        if self.config.radio_cpu_mutex {
            self.stack.set_radio_cpu_mutex(true)?;
        }

        if let Err(e) = self.set_transmit_power_level(self.config.initial_tx_power) {
            warn!("RADIO: initial tx power {} rejected: {:?}", self.config.initial_tx_power.dbm(), e);
        }

        self.register_services(serial_number, services)?;

        self.apply(&intent)?;
        self.state.initialized = true;
        info!("RADIO: up, advertising as connectable");
        Ok(())
    }

    fn register_services<G: GattServices>(&mut self, serial_number: &str, services: &mut G) -> Result<(), RadioError> {
        if self.config.dfu_service_enabled && self.registered_services & SERVICE_DFU == 0 {
            services.register_dfu_service()?;
            self.registered_services |= SERVICE_DFU;
        }
        if self.config.device_info_service_enabled && self.registered_services & SERVICE_DEVICE_INFO == 0 {
            let info = DeviceInformation::new(self.config.model_name, serial_number);
            services.register_device_information(&info)?;
            self.registered_services |= SERVICE_DEVICE_INFO;
        }
        if self.config.event_service_enabled && self.registered_services & SERVICE_EVENT == 0 {
            services.register_event_service()?;
            self.registered_services |= SERVICE_EVENT;
        }
        Ok(())
    }

    /// Select one of the eight power levels (0 = lowest, 7 = highest).
    ///
    /// Applies to every frame sent afterwards, whatever the mode.
    pub fn set_transmit_power(&mut self, level_index: i32) -> Result<(), RadioError> {
        let level = PowerLevel::new(level_index)?;
        self.ensure_initialized()?;
        self.set_transmit_power_level(level)
    }

    fn set_transmit_power_level(&mut self, level: PowerLevel) -> Result<(), RadioError> {
        if self.stack.set_tx_power(level.dbm()).is_err() {
            warn!("RADIO: stack refused {} dBm", level.dbm());
            return Err(RadioError::Unsupported);
        }
        debug!("RADIO: tx power {} dBm", level.dbm());
        self.state.tx_power = Some(level);
        Ok(())
    }

    /// Switch to `intent`, replacing whatever was advertised before.
    pub fn advertise(&mut self, intent: &AdvertisingIntent<'_>) -> Result<(), RadioError> {
        self.ensure_initialized()?;
        self.apply(intent)
    }

    fn apply(&mut self, intent: &AdvertisingIntent<'_>) -> Result<(), RadioError> {
        let touched_stack = intent.validate().and(intent.interval(&self.config)).is_ok();
        match advertising::transition(&mut self.stack, &self.config, intent) {
            Ok((mode, adv_type, interval)) => {
                self.state.set_mode(mode, adv_type, interval);
                Ok(())
            }
            Err(e) => {
                if touched_stack {
                    error!("RADIO: transition to {:?} failed: {:?}", intent.mode(), e);
                    self.state.set_aborted();
                }
                Err(e)
            }
        }
    }

    /// Broadcast an Eddystone URL frame.
    pub fn advertise_eddystone_url(
        &mut self,
        url: &str,
        calibrated_power: i8,
        connectable: bool,
        interval_ms: u16,
    ) -> Result<(), RadioError> {
        self.advertise(&AdvertisingIntent::EddystoneUrl {
            url,
            calibrated_power,
            connectable,
            interval_ms,
        })
    }

    /// Broadcast an iBeacon frame.
    pub fn advertise_ibeacon(
        &mut self,
        proximity_uuid: [u8; 16],
        major: u16,
        minor: u16,
        calibrated_power: i8,
        interval_ms: u16,
    ) -> Result<(), RadioError> {
        self.advertise(&AdvertisingIntent::IBeacon {
            proximity_uuid,
            major,
            minor,
            calibrated_power,
            interval_ms,
        })
    }

    /// Go back to connectable advertising under the initialized device name.
    pub fn advertise_connectable(&mut self) -> Result<(), RadioError> {
        let name = self.device_name.clone();
        self.advertise(&AdvertisingIntent::Connectable { device_name: name.as_str() })
    }

    /// Halt transmission. The stored mode is kept; calling it again is harmless.
    pub fn stop_advertising(&mut self) -> Result<(), RadioError> {
        self.ensure_initialized()?;
        self.stack.stop_advertising()?;
        self.state.advertising = false;
        Ok(())
    }

    /// A peer asked to pair; clears the outcome of any earlier attempt.
    pub fn on_pairing_requested(&mut self) {
        self.state.pairing = PairingStatus(PAIR_REQUEST);
    }

    /// A passkey is being shown to the user.
    pub fn on_passcode_displayed(&mut self) {
        self.state.pairing.set(PAIR_PASSCODE);
    }

    /// Record the end of a pairing attempt; the link is dropped on the next
    /// idle tick.
    pub fn on_pairing_complete(&mut self, conn_handle: u16, success: bool) {
        self.state.pairing.set(PAIR_COMPLETE);
        if success {
            self.state.pairing.set(PAIR_SUCCESSFUL);
        }
        self.state.pending_disconnect = conn_handle;
        debug!("RADIO: pairing complete on {}, success={}", conn_handle, success);
    }

    /// Dispatch a pairing event from the security layer.
    pub fn on_pairing_event(&mut self, event: PairingEvent) {
        match event {
            PairingEvent::Requested => self.on_pairing_requested(),
            PairingEvent::PasscodeDisplayed => self.on_passcode_displayed(),
            PairingEvent::Complete { conn_handle, success } => self.on_pairing_complete(conn_handle, success),
        }
    }

    /// Periodic low-priority hook for deferred work. Never blocks.
    pub fn idle_tick(&mut self) {
        if !self.state.initialized || !self.state.has_pending_disconnect() {
            return;
        }

        let handle = self.state.pending_disconnect;
        self.state.pending_disconnect = INVALID_CONN_HANDLE;
        match self.stack.disconnect(handle) {
            Ok(()) => debug!("RADIO: disconnected {} after pairing", handle),
            Err(e) => warn!("RADIO: post-pairing disconnect of {} failed: {:?}", handle, e),
        }
    }

    fn ensure_initialized(&self) -> Result<(), RadioError> {
        if !self.state.initialized {
            error!("RADIO: used before initialize");
            return Err(RadioError::NotInitialized);
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.state.initialized
    }

    pub fn mode(&self) -> AdvertisingMode {
        self.state.mode
    }

    pub fn is_advertising(&self) -> bool {
        self.state.advertising
    }

    pub fn tx_power(&self) -> Option<PowerLevel> {
        self.state.tx_power
    }

    pub fn pairing_status(&self) -> PairingStatus {
        self.state.pairing
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn gap_state(&self) -> &GapState {
        &self.state
    }

    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }
}
