#![no_std]
#![no_main]

use defmt::{info, unwrap};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_nrf::{config::Config, interrupt};
use embassy_time::{Duration, Timer};
use microbit_ble_radio::config::{friendly_name, serial_number};
use microbit_ble_radio::softdevice::{
    advertising_task, forward_pairing_events, SoftdeviceServices, SoftdeviceStack,
};
use microbit_ble_radio::{RadioConfig, RadioSession};
use nrf_softdevice::{Config as SdConfig, Softdevice};
use panic_probe as _;

/// Period of the low-priority radio housekeeping
const IDLE_TICK: Duration = Duration::from_millis(100);

/// Idle ticks between heartbeat log lines
const HEARTBEAT_TICKS: u32 = 100;

fn device_serial() -> u32 {
    embassy_nrf::pac::FICR.deviceid(1).read()
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Starting micro:bit BLE radio");

    // Configure interrupt priorities to avoid SoftDevice reserved levels (0, 1, 4)
    let mut nrf_config = Config::default();
    nrf_config.gpiote_interrupt_priority = interrupt::Priority::P2;
    nrf_config.time_interrupt_priority = interrupt::Priority::P2;
    let _peripherals = embassy_nrf::init(nrf_config);

    let sd_config = SdConfig {
        clock: Some(nrf_softdevice::raw::nrf_clock_lf_cfg_t {
            source: nrf_softdevice::raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: nrf_softdevice::raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(nrf_softdevice::raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(nrf_softdevice::raw::ble_gatt_conn_cfg_t { att_mtu: 23 }),
        gatts_attr_tab_size: Some(nrf_softdevice::raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: 1408,
        }),
        gap_role_count: Some(nrf_softdevice::raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: Default::default(),
        }),
        ..Default::default()
    };

    let sd = Softdevice::enable(&sd_config);
    info!("SoftDevice enabled");

    let serial = device_serial();
    let name = friendly_name(serial);
    let serial_str = serial_number(serial);

    let mut services = SoftdeviceServices::new(&mut *sd);
    let mut radio = RadioSession::new(SoftdeviceStack::new(), RadioConfig::default());
    if let Err(e) = radio.initialize(&name, &serial_str, &mut services) {
        defmt::panic!("Radio initialization failed: {:?}", e);
    }
    let server = services.into_server();
    let sd: &'static Softdevice = sd;

    unwrap!(spawner.spawn(softdevice_task(sd)));
    unwrap!(spawner.spawn(advertising_task(sd, server)));

    info!("Advertising as {=str}, entering idle loop", radio.device_name());

    let mut ticks: u32 = 0;
    loop {
        Timer::after(IDLE_TICK).await;
        forward_pairing_events(&mut radio);
        radio.idle_tick();

        ticks = ticks.wrapping_add(1);
        if ticks % HEARTBEAT_TICKS == 0 {
            info!("Heartbeat - mode {:?}, advertising {}", radio.mode(), radio.is_advertising());
        }
    }
}

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}
