//! Advertising Task
//!
//! Runs whatever advertising the stack adapter last requested. Connectable
//! advertising hands each accepted link to the GATT server and resumes
//! advertising once the link drops; a configured timeout returns the task to
//! idle until the next start command.

use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Timer};
use nrf_softdevice::ble::gatt_server;
use nrf_softdevice::ble::peripheral::{
    self, AdvertiseError, ConnectableAdvertisement, NonconnectableAdvertisement,
};
use nrf_softdevice::ble::Connection;
use nrf_softdevice::Softdevice;

use super::security::{self, RADIO_SECURITY};
use super::services::{RadioServer, RadioServerEvent};
use super::stack::{AdvCommand, AdvSnapshot, ADV_COMMANDS};
use crate::ble::advertising::AdvertisingType;

/// Back-off after the SoftDevice rejects an advertising set
const RETRY_DELAY: Duration = Duration::from_secs(1);

async fn advertise_once(sd: &Softdevice, snapshot: &AdvSnapshot) -> Result<Option<Connection>, AdvertiseError> {
    let mut config = peripheral::Config::default();
    config.interval = snapshot.interval;
    config.tx_power = snapshot.tx_power;
    config.timeout = snapshot.timeout;

    match snapshot.adv_type {
        AdvertisingType::ConnectableUndirected => {
            let adv = ConnectableAdvertisement::ScannableUndirected {
                adv_data: &snapshot.adv_data,
                scan_data: &[],
            };
            peripheral::advertise_pairable(sd, adv, &config, &RADIO_SECURITY)
                .await
                .map(Some)
        }
        AdvertisingType::NonConnectableUndirected => {
            let adv = NonconnectableAdvertisement::NonscannableUndirected {
                adv_data: &snapshot.adv_data,
            };
            peripheral::advertise(sd, adv, &config).await.map(|()| None)
        }
    }
}

/// Fold a command into the advertising set that should be on air
fn apply(cmd: AdvCommand, active: Option<AdvSnapshot>) -> Option<AdvSnapshot> {
    match cmd {
        AdvCommand::Start(snapshot) => Some(snapshot),
        AdvCommand::Stop => None,
        AdvCommand::Disconnect(handle) => {
            debug!("ADV: no link {} to drop", handle);
            active
        }
    }
}

fn on_server_event(event: RadioServerEvent) {
    match event {
        RadioServerEvent::DfuRequested => info!("ADV: DFU requested, bootloader entry is up to the application"),
        RadioServerEvent::ClientEvent { id, value } => debug!("ADV: client event {}={}", id, value),
    }
}

/// Serve one connection until it drops. Advertising commands received
/// meanwhile only change what resumes afterwards.
async fn serve(conn: Connection, server: &RadioServer, mut active: Option<AdvSnapshot>) -> Option<AdvSnapshot> {
    let handle = conn.handle().unwrap_or(0);
    info!("ADV: connected, handle {}", handle);

    loop {
        match select(gatt_server::run(&conn, server, on_server_event), ADV_COMMANDS.receive()).await {
            Either::First(e) => {
                info!("ADV: link {} closed: {:?}", handle, defmt::Debug2Format(&e));
                security::on_link_closed(handle);
                return active;
            }
            Either::Second(AdvCommand::Disconnect(target)) if target == handle => {
                if let Err(e) = conn.disconnect() {
                    warn!("ADV: disconnect of {} failed: {:?}", handle, defmt::Debug2Format(&e));
                }
            }
            Either::Second(cmd) => active = apply(cmd, active),
        }
    }
}

#[embassy_executor::task]
pub async fn advertising_task(sd: &'static Softdevice, server: RadioServer) {
    info!("ADV: task started");
    let mut active: Option<AdvSnapshot> = None;

    loop {
        let Some(snapshot) = active.clone() else {
            active = apply(ADV_COMMANDS.receive().await, None);
            continue;
        };

        match select(advertise_once(sd, &snapshot), ADV_COMMANDS.receive()).await {
            Either::First(Ok(Some(conn))) => active = serve(conn, &server, active).await,
            Either::First(Ok(None)) => {}
            Either::First(Err(AdvertiseError::Timeout)) => {
                info!("ADV: timed out, idle until restarted");
                active = None;
            }
            Either::First(Err(e)) => {
                error!("ADV: advertising failed: {:?}", defmt::Debug2Format(&e));
                Timer::after(RETRY_DELAY).await;
            }
            Either::Second(cmd) => active = apply(cmd, active),
        }
    }
}
