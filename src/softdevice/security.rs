//! Pairing Security
//!
//! SoftDevice security callbacks run inside the stack's event dispatch, away
//! from the radio session. They only queue [`PairingEvent`]s; the session
//! owner drains the queue with [`forward_pairing_events`] from its idle loop.
//!
//! Bond keys are not persisted, so a bonded peer pairs again after reset.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use nrf_softdevice::ble::security::{IoCapabilities, SecurityHandler};
use nrf_softdevice::ble::{Connection, SecurityMode};

use crate::ble::session::{PairingEvent, RadioSession};
use crate::ble::stack::BleStack;

/// Set by `SoftdeviceStack::init` from the radio configuration
static BONDING_ENABLED: AtomicBool = AtomicBool::new(false);

/// A peer has asked to pair and no outcome has been reported yet
static PAIRING_PENDING: AtomicBool = AtomicBool::new(false);

static PAIRING_EVENTS: Channel<CriticalSectionRawMutex, PairingEvent, 4> = Channel::new();

pub(crate) fn set_bonding_enabled(enabled: bool) {
    BONDING_ENABLED.store(enabled, Ordering::Relaxed);
}

pub(crate) fn bonding_enabled() -> bool {
    BONDING_ENABLED.load(Ordering::Relaxed)
}

fn post(event: PairingEvent) {
    if PAIRING_EVENTS.try_send(event).is_err() {
        warn!("SEC: pairing event queue full, dropped {:?}", event);
    }
}

/// Report a link that closed in the middle of pairing as a failed attempt.
pub(crate) fn on_link_closed(conn_handle: u16) {
    if PAIRING_PENDING.swap(false, Ordering::Relaxed) {
        warn!("SEC: link {} closed while pairing", conn_handle);
        post(PairingEvent::Complete {
            conn_handle,
            success: false,
        });
    }
}

/// Hand queued pairing events to the session. Never blocks.
pub fn forward_pairing_events<S: BleStack>(radio: &mut RadioSession<S>) {
    while let Ok(event) = PAIRING_EVENTS.try_receive() {
        radio.on_pairing_event(event);
    }
}

/// Security handler passed to connectable advertising
pub struct RadioSecurity;

pub static RADIO_SECURITY: RadioSecurity = RadioSecurity;

impl SecurityHandler for RadioSecurity {
    fn io_capabilities(&self) -> IoCapabilities {
        IoCapabilities::DisplayOnly
    }

    fn can_bond(&self, conn: &Connection) -> bool {
        PAIRING_PENDING.store(true, Ordering::Relaxed);
        post(PairingEvent::Requested);
        let bonding = bonding_enabled();
        debug!("SEC: pairing requested on {}, bonding={}", conn.handle().unwrap_or(0), bonding);
        bonding
    }

    fn display_passkey(&self, passkey: &[u8; 6]) {
        info!("SEC: passkey {=[u8]:a}", &passkey[..]);
        post(PairingEvent::PasscodeDisplayed);
    }

    fn on_security_update(&self, conn: &Connection, security_mode: SecurityMode) {
        if !PAIRING_PENDING.swap(false, Ordering::Relaxed) {
            return;
        }
        let success = !matches!(security_mode, SecurityMode::Open | SecurityMode::NoAccess);
        info!("SEC: security mode {:?}", security_mode);
        post(PairingEvent::Complete {
            conn_handle: conn.handle().unwrap_or(0),
            success,
        });
    }
}
