//! Radio session lifecycle tests
//!
//! Run on the host against a recording stack.

mod common;

use common::*;
use microbit_ble_radio::ble::gap_state::{PAIR_COMPLETE, PAIR_PASSCODE, PAIR_REQUEST, PAIR_SUCCESSFUL};
use microbit_ble_radio::ble::payload::AdType;
use microbit_ble_radio::config::MAX_ADVERTISING_TIMEOUT_SECONDS;
use microbit_ble_radio::{
    AdvertisingInterval, AdvertisingMode, AdvertisingType, PairingEvent, RadioConfig, RadioError, RadioSession,
    StackStatus,
};

#[test]
fn test_initialize_sequence() {
    let mut session = RadioSession::new(MockStack::nrf52(), RadioConfig::default());
    let mut services = MockServices::default();
    session.initialize(DEVICE_NAME, SERIAL, &mut services).unwrap();

    assert_eq!(
        session.stack().calls,
        vec![
            Call::Init(true),
            Call::CpuMutex(true),
            Call::TxPower(0),
            Call::Stop,
            Call::ClearPayload,
            Call::Type(AdvertisingType::ConnectableUndirected),
            Call::Interval(AdvertisingInterval::from_millis(200).unwrap()),
            Call::Accumulate(AdType::FLAGS, vec![0x06]),
            Call::Accumulate(AdType::COMPLETE_LOCAL_NAME, b"BBC micro:bit [zuvep]".to_vec()),
            Call::Start,
        ]
    );

    assert!(session.is_initialized());
    assert!(session.is_advertising());
    assert_eq!(session.mode(), AdvertisingMode::Connectable);
    assert_eq!(session.device_name(), DEVICE_NAME);
    assert_eq!(session.tx_power().map(|p| p.dbm()), Some(0));
}

#[test]
fn test_initialize_registers_services() {
    let mut session = RadioSession::new(MockStack::new(), RadioConfig::default());
    let mut services = MockServices::default();
    session.initialize(DEVICE_NAME, SERIAL, &mut services).unwrap();

    assert_eq!(services.registered, vec!["dfu", "device_information", "event"]);
    assert_eq!(services.model.as_deref(), Some("BBC micro:bit"));
    assert_eq!(services.serial_number.as_deref(), Some(SERIAL));
    assert_eq!(services.firmware_revision.as_deref(), Some(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_initialize_skips_disabled_services() {
    let config = RadioConfig {
        dfu_service_enabled: false,
        device_info_service_enabled: false,
        event_service_enabled: false,
        radio_cpu_mutex: false,
        bonding_enabled: false,
        ..RadioConfig::default()
    };
    let mut session = RadioSession::new(MockStack::new(), config);
    let mut services = MockServices::default();
    session.initialize(DEVICE_NAME, SERIAL, &mut services).unwrap();

    assert!(services.registered.is_empty());
    assert_eq!(session.stack().calls[0], Call::Init(false));
    assert_eq!(session.stack().count(&Call::CpuMutex(true)), 0);
}

#[test]
fn test_service_registration_failure_is_reported() {
    let mut session = RadioSession::new(MockStack::new(), RadioConfig::default());
    let mut services = MockServices {
        fail_dfu: true,
        ..MockServices::default()
    };

    assert_eq!(
        session.initialize(DEVICE_NAME, SERIAL, &mut services),
        Err(RadioError::StackFault(StackStatus::NO_MEM))
    );
    assert_eq!(session.stack().count(&Call::Start), 0);
}

#[test]
fn test_initialize_twice_touches_nothing() {
    let mut session = initialized_session();
    let mark = session.stack().calls.len();

    assert_eq!(
        session.initialize("other", SERIAL, &mut MockServices::default()),
        Err(RadioError::AlreadyInitialized)
    );
    assert!(session.stack().calls_since(mark).is_empty());
    assert_eq!(session.device_name(), DEVICE_NAME);
    assert_eq!(session.mode(), AdvertisingMode::Connectable);
}

#[test]
fn test_initial_power_rejection_is_not_fatal() {
    let config = RadioConfig {
        initial_tx_power: microbit_ble_radio::PowerLevel::MIN,
        ..RadioConfig::default()
    };
    let mut session = RadioSession::new(MockStack::nrf52(), config);
    session.initialize(DEVICE_NAME, SERIAL, &mut MockServices::default()).unwrap();

    assert_eq!(session.tx_power(), None);
    assert_eq!(session.mode(), AdvertisingMode::Connectable);
}

#[test]
fn test_oversized_name_rejected_before_stack_starts() {
    let mut session = RadioSession::new(MockStack::new(), RadioConfig::default());

    assert_eq!(
        session.initialize("abcdefghijk", SERIAL, &mut MockServices::default()),
        Err(RadioError::PayloadTooLarge)
    );
    assert!(session.stack().calls.is_empty());
    assert!(!session.is_initialized());

    // the session is still usable with a name that fits
    session.initialize("abcdefghij", SERIAL, &mut MockServices::default()).unwrap();
    assert_eq!(session.mode(), AdvertisingMode::Connectable);
}

#[test]
fn test_operations_before_initialize() {
    let mut session = RadioSession::new(MockStack::new(), RadioConfig::default());

    assert_eq!(session.advertise_connectable(), Err(RadioError::NotInitialized));
    assert_eq!(
        session.advertise_eddystone_url("https://microbit.org", -16, false, 400),
        Err(RadioError::NotInitialized)
    );
    assert_eq!(session.set_transmit_power(3), Err(RadioError::NotInitialized));
    assert_eq!(session.stop_advertising(), Err(RadioError::NotInitialized));
    // range is checked first
    assert_eq!(session.set_transmit_power(9), Err(RadioError::InvalidParameter));

    session.idle_tick();
    assert!(session.stack().calls.is_empty());
    assert_eq!(session.mode(), AdvertisingMode::None);
}

#[test]
fn test_start_failure_leaves_no_mode() {
    let stack = MockStack {
        fail_start: Some(StackStatus::BUSY),
        ..MockStack::new()
    };
    let mut session = RadioSession::new(stack, RadioConfig::default());

    assert_eq!(
        session.initialize(DEVICE_NAME, SERIAL, &mut MockServices::default()),
        Err(RadioError::StackFault(StackStatus::BUSY))
    );
    assert!(!session.is_initialized());
    assert_eq!(session.mode(), AdvertisingMode::None);
    assert!(!session.is_advertising());
    assert_eq!(session.advertise_connectable(), Err(RadioError::NotInitialized));
}

#[test]
fn test_initialize_retry_after_start_failure() {
    let stack = MockStack {
        fail_start: Some(StackStatus::BUSY),
        ..MockStack::new()
    };
    let mut session = RadioSession::new(stack, RadioConfig::default());
    let mut services = MockServices::default();

    assert!(session.initialize(DEVICE_NAME, SERIAL, &mut services).is_err());
    session.initialize(DEVICE_NAME, SERIAL, &mut services).unwrap();

    assert!(session.is_initialized());
    assert!(session.is_advertising());
    assert_eq!(session.mode(), AdvertisingMode::Connectable);
    // the stack is started once and services are not added twice
    assert_eq!(session.stack().count(&Call::Init(true)), 1);
    assert_eq!(services.registered, vec!["dfu", "device_information", "event"]);
}

#[test]
fn test_initialize_retry_after_registration_failure() {
    let mut session = RadioSession::new(MockStack::new(), RadioConfig::default());
    let mut services = MockServices {
        fail_event: true,
        ..MockServices::default()
    };

    assert_eq!(
        session.initialize(DEVICE_NAME, SERIAL, &mut services),
        Err(RadioError::StackFault(StackStatus::NO_MEM))
    );
    assert!(!session.is_initialized());
    assert_eq!(services.registered, vec!["dfu", "device_information"]);

    services.fail_event = false;
    session.initialize(DEVICE_NAME, SERIAL, &mut services).unwrap();

    assert_eq!(services.registered, vec!["dfu", "device_information", "event"]);
    assert_eq!(session.stack().count(&Call::Init(true)), 1);
    assert_eq!(session.mode(), AdvertisingMode::Connectable);
}

#[test]
fn test_initialize_retry_after_init_failure() {
    let stack = MockStack {
        fail_init: Some(StackStatus::INTERNAL),
        ..MockStack::new()
    };
    let mut session = RadioSession::new(stack, RadioConfig::default());

    assert_eq!(
        session.initialize(DEVICE_NAME, SERIAL, &mut MockServices::default()),
        Err(RadioError::StackFault(StackStatus::INTERNAL))
    );
    assert_eq!(session.stack().calls, vec![Call::Init(true)]);
    assert!(!session.is_initialized());
}

#[test]
fn test_set_transmit_power() {
    let mut session = initialized_session();

    session.set_transmit_power(7).unwrap();
    assert_eq!(session.stack().tx_power, Some(4));
    assert_eq!(session.tx_power().map(|p| p.index()), Some(7));

    // -30 dBm does not exist on this radio
    assert_eq!(session.set_transmit_power(0), Err(RadioError::Unsupported));
    assert_eq!(session.tx_power().map(|p| p.index()), Some(7));

    let mark = session.stack().calls.len();
    assert_eq!(session.set_transmit_power(8), Err(RadioError::InvalidParameter));
    assert_eq!(session.set_transmit_power(-1), Err(RadioError::InvalidParameter));
    assert!(session.stack().calls_since(mark).is_empty());
}

#[test]
fn test_power_survives_mode_changes() {
    let mut session = initialized_session();
    session.set_transmit_power(2).unwrap();

    session.advertise_ibeacon([0; 16], 1, 2, -59, 100).unwrap();
    session.advertise_connectable().unwrap();

    assert_eq!(session.stack().tx_power, Some(-16));
    assert_eq!(session.stack().count(&Call::TxPower(-16)), 1);
}

#[test]
fn test_stop_is_idempotent() {
    let mut session = initialized_session();

    session.stop_advertising().unwrap();
    session.stop_advertising().unwrap();

    assert!(!session.is_advertising());
    assert!(!session.stack().advertising);
    assert_eq!(session.mode(), AdvertisingMode::Connectable);
}

#[test]
fn test_advertising_timeout_applied_before_start() {
    let config = RadioConfig {
        advertising_timeout_seconds: 30,
        ..RadioConfig::default()
    };
    let session = initialized_session_with(config);
    let calls = &session.stack().calls;

    let timeout = calls.iter().position(|c| *c == Call::Timeout(30)).unwrap();
    let start = calls.iter().position(|c| *c == Call::Start).unwrap();
    assert!(timeout < start);
}

#[test]
fn test_longest_advertising_timeout_accepted() {
    let config = RadioConfig {
        advertising_timeout_seconds: MAX_ADVERTISING_TIMEOUT_SECONDS,
        ..RadioConfig::default()
    };
    let session = initialized_session_with(config);
    assert_eq!(session.stack().count(&Call::Timeout(655)), 1);
}

#[test]
fn test_advertising_timeout_out_of_range_rejected_before_stack_starts() {
    let config = RadioConfig {
        advertising_timeout_seconds: MAX_ADVERTISING_TIMEOUT_SECONDS + 1,
        ..RadioConfig::default()
    };
    let mut session = RadioSession::new(MockStack::new(), config);

    assert_eq!(
        session.initialize(DEVICE_NAME, SERIAL, &mut MockServices::default()),
        Err(RadioError::InvalidParameter)
    );
    assert!(session.stack().calls.is_empty());
    assert!(!session.is_initialized());
}

#[test]
fn test_no_timeout_by_default() {
    let session = initialized_session();
    assert!(!session.stack().calls.iter().any(|c| matches!(c, Call::Timeout(_))));
}

#[test]
fn test_whitelist_flags() {
    let config = RadioConfig {
        whitelist_only: true,
        ..RadioConfig::default()
    };
    let session = initialized_session_with(config);
    assert_eq!(records(&session.stack().payload)[0], (0x01, vec![0x04]));
}

#[test]
fn test_pairing_then_disconnect_on_idle() {
    let mut session = initialized_session();

    session.on_pairing_requested();
    session.on_passcode_displayed();
    assert!(session.pairing_status().contains(PAIR_REQUEST | PAIR_PASSCODE));

    session.on_pairing_complete(7, true);
    assert!(session.pairing_status().contains(PAIR_COMPLETE | PAIR_SUCCESSFUL));

    let mark = session.stack().calls.len();
    session.idle_tick();
    assert_eq!(session.stack().calls_since(mark), &[Call::Disconnect(7)]);

    // one-shot
    session.idle_tick();
    assert_eq!(session.stack().count(&Call::Disconnect(7)), 1);

    // a new request clears the previous outcome
    session.on_pairing_requested();
    assert!(!session.pairing_status().contains(PAIR_SUCCESSFUL));
}

#[test]
fn test_failed_pairing_still_disconnects() {
    let mut session = initialized_session();
    session.on_pairing_complete(3, false);

    assert!(session.pairing_status().contains(PAIR_COMPLETE));
    assert!(!session.pairing_status().contains(PAIR_SUCCESSFUL));

    session.idle_tick();
    assert_eq!(session.stack().count(&Call::Disconnect(3)), 1);
}

#[test]
fn test_pairing_events_dispatch() {
    let mut session = initialized_session();

    session.on_pairing_event(PairingEvent::Requested);
    session.on_pairing_event(PairingEvent::PasscodeDisplayed);
    assert!(session.pairing_status().contains(PAIR_REQUEST | PAIR_PASSCODE));

    session.on_pairing_event(PairingEvent::Complete {
        conn_handle: 4,
        success: true,
    });
    assert!(session.pairing_status().contains(PAIR_COMPLETE | PAIR_SUCCESSFUL));

    session.idle_tick();
    assert_eq!(session.stack().count(&Call::Disconnect(4)), 1);
}
