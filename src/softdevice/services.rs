//! GATT Services
//!
//! Device information, micro:bit DFU control and micro:bit event services,
//! registered through the SoftDevice `ServiceBuilder`.

use nrf_softdevice::ble::gatt_server::builder::ServiceBuilder;
use nrf_softdevice::ble::gatt_server::characteristic::{Attribute, Metadata, Properties};
use nrf_softdevice::ble::gatt_server::{self, CharacteristicHandles, RegisterError, WriteOp};
use nrf_softdevice::ble::{Connection, Uuid};
use nrf_softdevice::Softdevice;

use crate::ble::stack::{GattServices, StackStatus};
use crate::config::DeviceInformation;

const DEVICE_INFORMATION_SERVICE: u16 = 0x180a;
const MODEL_NUMBER: u16 = 0x2a24;
const SERIAL_NUMBER: u16 = 0x2a25;
const FIRMWARE_REVISION: u16 = 0x2a26;
const HARDWARE_REVISION: u16 = 0x2a27;
const SOFTWARE_REVISION: u16 = 0x2a28;
const MANUFACTURER_NAME: u16 = 0x2a29;

const DFU_CONTROL_SERVICE: u16 = 0x93b0;
const DFU_CONTROL: u16 = 0x93b1;

const EVENT_SERVICE: u16 = 0x93af;
const MICROBIT_REQUIREMENTS: u16 = 0xb84c;
const MICROBIT_EVENT: u16 = 0x9775;
const CLIENT_REQUIREMENTS: u16 = 0x23c4;
const CLIENT_EVENT: u16 = 0x5404;

/// DFU control opcode asking the device to reboot into its bootloader
pub const DFU_ENTER_BOOTLOADER: u8 = 0x01;

/// Event value: 16-bit id and 16-bit value, little endian
const EVENT_LEN: usize = 4;

/// 128-bit micro:bit UUID `E95Dxxxx-251D-470A-A062-FA1922DFA9A8`
fn microbit_uuid(short: u16) -> Uuid {
    let mut be = [
        0xe9, 0x5d, 0x00, 0x00, 0x25, 0x1d, 0x47, 0x0a, 0xa0, 0x62, 0xfa, 0x19, 0x22, 0xdf, 0xa9, 0xa8,
    ];
    be[2..4].copy_from_slice(&short.to_be_bytes());
    // the SoftDevice takes UUIDs little endian
    be.reverse();
    Uuid::new_128(&be)
}

fn register_status(e: RegisterError) -> StackStatus {
    error!("GATT: service registration failed: {:?}", defmt::Debug2Format(&e));
    StackStatus::NO_MEM
}

fn add_characteristic(
    sb: &mut ServiceBuilder,
    uuid: Uuid,
    props: Properties,
    value: &[u8],
) -> Result<CharacteristicHandles, StackStatus> {
    let handles = sb
        .add_characteristic(uuid, Attribute::new(value), Metadata::new(props))
        .map_err(register_status)?
        .build();
    Ok(handles)
}

/// Events raised by writes from the central
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum RadioServerEvent {
    /// Central asked for a reboot into the bootloader
    DfuRequested,
    /// Central raised an event on the device bus
    ClientEvent { id: u16, value: u16 },
}

/// Value handles of the services registered at startup
#[derive(Debug, Default, Clone, Copy)]
pub struct RadioServer {
    dfu_control: Option<u16>,
    client_event: Option<u16>,
    client_requirements: Option<u16>,
}

impl gatt_server::Server for RadioServer {
    type Event = RadioServerEvent;

    fn on_write(&self, conn: &Connection, handle: u16, op: WriteOp, offset: usize, data: &[u8]) -> Option<Self::Event> {
        let conn_handle = conn.handle().unwrap_or(0);

        if Some(handle) == self.dfu_control {
            if data.first() == Some(&DFU_ENTER_BOOTLOADER) {
                info!("GATT: DFU requested by {}", conn_handle);
                return Some(RadioServerEvent::DfuRequested);
            }
            return None;
        }

        if Some(handle) == self.client_event && data.len() >= EVENT_LEN {
            let id = u16::from_le_bytes([data[0], data[1]]);
            let value = u16::from_le_bytes([data[2], data[3]]);
            return Some(RadioServerEvent::ClientEvent { id, value });
        }

        if Some(handle) == self.client_requirements {
            debug!("GATT: client requirements updated ({} bytes)", data.len());
            return None;
        }

        debug!(
            "GATT: write to unknown handle {} (op: {:?}, offset: {}, len: {})",
            handle,
            defmt::Debug2Format(&op),
            offset,
            data.len()
        );
        None
    }
}

/// Registers services against an enabled SoftDevice before any task starts
pub struct SoftdeviceServices<'a> {
    sd: &'a mut Softdevice,
    server: RadioServer,
}

impl<'a> SoftdeviceServices<'a> {
    pub fn new(sd: &'a mut Softdevice) -> Self {
        Self {
            sd,
            server: RadioServer::default(),
        }
    }

    /// Handles for the GATT server loop
    pub fn into_server(self) -> RadioServer {
        self.server
    }
}

impl GattServices for SoftdeviceServices<'_> {
    fn register_device_information(&mut self, info: &DeviceInformation<'_>) -> Result<(), StackStatus> {
        let mut sb =
            ServiceBuilder::new(&mut *self.sd, Uuid::new_16(DEVICE_INFORMATION_SERVICE)).map_err(register_status)?;
        add_characteristic(&mut sb, Uuid::new_16(MODEL_NUMBER), Properties::new().read(), info.model.as_bytes())?;
        add_characteristic(&mut sb, Uuid::new_16(SERIAL_NUMBER), Properties::new().read(), info.serial_number.as_bytes())?;
        add_characteristic(&mut sb, Uuid::new_16(FIRMWARE_REVISION), Properties::new().read(), info.firmware_revision.as_bytes())?;
        let optional = [
            (HARDWARE_REVISION, info.hardware_revision),
            (SOFTWARE_REVISION, info.software_revision),
            (MANUFACTURER_NAME, info.manufacturer),
        ];
        for (uuid, value) in optional {
            if let Some(value) = value {
                add_characteristic(&mut sb, Uuid::new_16(uuid), Properties::new().read(), value.as_bytes())?;
            }
        }

        let _ = sb.build();
        info!("GATT: device information registered");
        Ok(())
    }

    fn register_dfu_service(&mut self) -> Result<(), StackStatus> {
        let mut sb = ServiceBuilder::new(&mut *self.sd, microbit_uuid(DFU_CONTROL_SERVICE)).map_err(register_status)?;
        let control = add_characteristic(
            &mut sb,
            microbit_uuid(DFU_CONTROL),
            Properties::new().read().write(),
            &[0u8],
        )?;
        let _ = sb.build();

        self.server.dfu_control = Some(control.value_handle);
        info!("GATT: DFU control registered");
        Ok(())
    }

    fn register_event_service(&mut self) -> Result<(), StackStatus> {
        let mut sb = ServiceBuilder::new(&mut *self.sd, microbit_uuid(EVENT_SERVICE)).map_err(register_status)?;
        let empty = [0u8; EVENT_LEN];

        add_characteristic(
            &mut sb,
            microbit_uuid(MICROBIT_REQUIREMENTS),
            Properties::new().read().notify(),
            &empty,
        )?;
        add_characteristic(
            &mut sb,
            microbit_uuid(MICROBIT_EVENT),
            Properties::new().read().notify(),
            &empty,
        )?;
        let requirements = add_characteristic(
            &mut sb,
            microbit_uuid(CLIENT_REQUIREMENTS),
            Properties::new().write(),
            &empty,
        )?;
        let event = add_characteristic(
            &mut sb,
            microbit_uuid(CLIENT_EVENT),
            Properties::new().write(),
            &empty,
        )?;
        let _ = sb.build();

        self.server.client_requirements = Some(requirements.value_handle);
        self.server.client_event = Some(event.value_handle);
        info!("GATT: event service registered");
        Ok(())
    }
}
