//! Bluetooth module
//!
//! The phone pushes weather data items and the current time through a GATT
//! server running on the nRF SoftDevice.

// Core
use core::mem;

// BLE
use nrf_softdevice::{
    ble::{
        advertisement_builder::{
            Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload, ServiceList,
            ServiceUuid16,
        },
        gatt_server, peripheral,
    },
    raw, Config, Softdevice,
};

// Crate
use sunshine_face::{
    clock::{decode_current_time, decode_local_time_info},
    reconciler::log_item,
    DataItem, FaceEvent,
};

use super::time;
use crate::{DATA_ITEMS, FACE_EVENTS, PEER};

const DEVICE_NAME: &[u8] = b"Sunshine";

pub static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
    .services_16(ServiceList::Incomplete, &[ServiceUuid16::CURRENT_TIME])
    .full_name("Sunshine")
    .build();

pub static SCAN_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .services_16(ServiceList::Incomplete, &[ServiceUuid16::CURRENT_TIME])
    .build();

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub time: TimeService,
    pub weather: WeatherService,
}

/// Current Time Service, written by the phone
#[nrf_softdevice::gatt_service(uuid = "1805")]
pub struct TimeService {
    #[characteristic(uuid = "2a2b", read, write)]
    pub current_time: [u8; 10],
    #[characteristic(uuid = "2a0f", read, write)]
    pub local_time_info: [u8; 2],
}

/// Data items pushed by the phone, one JSON document per write
#[nrf_softdevice::gatt_service(uuid = "3e5a0100-6f84-4a34-9f5d-7b2c0d3e8a41")]
pub struct WeatherService {
    #[characteristic(uuid = "3e5a0101-6f84-4a34-9f5d-7b2c0d3e8a41", write)]
    pub data_item: heapless::Vec<u8, 244>,
}

/// SoftDevice configuration for a single peripheral connection
pub fn softdevice_config() -> Config {
    Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 256 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: DEVICE_NAME.as_ptr() as _,
            current_len: DEVICE_NAME.len() as u16,
            max_len: DEVICE_NAME.len() as u16,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

/// Run the SoftDevice event loop
#[embassy_executor::task]
pub async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

/// Advertise, serve one phone at a time, and report its presence
#[embassy_executor::task]
pub async fn ble_task(sd: &'static Softdevice, server: Server) -> ! {
    let config = peripheral::Config::default();
    loop {
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };
        let conn = match peripheral::advertise_connectable(sd, adv, &config).await {
            Ok(conn) => conn,
            Err(err) => {
                defmt::warn!("Advertising failed: {:?}", err);
                continue;
            }
        };
        PEER.signal(true);

        let reason = gatt_server::run(&conn, &server, |event| match event {
            ServerEvent::Time(TimeServiceEvent::CurrentTimeWrite(bytes)) => {
                on_current_time(&bytes)
            }
            ServerEvent::Time(TimeServiceEvent::LocalTimeInfoWrite(bytes)) => {
                on_local_time_info(&bytes)
            }
            ServerEvent::Weather(WeatherServiceEvent::DataItemWrite(bytes)) => {
                on_data_item(&bytes)
            }
        })
        .await;

        defmt::info!("Phone disconnected: {:?}", reason);
        PEER.signal(false);
    }
}

fn on_current_time(bytes: &[u8]) {
    match decode_current_time(bytes) {
        Ok(local) => {
            time::set_local_time(local);
            if FACE_EVENTS.try_send(FaceEvent::TimeTick).is_err() {
                defmt::warn!("Face event queue full, dropping time update");
            }
        }
        Err(err) => defmt::warn!("Rejected current time: {}", err),
    }
}

fn on_local_time_info(bytes: &[u8]) {
    match decode_local_time_info(bytes) {
        Ok(offset) => {
            time::set_offset(offset);
            let event = FaceEvent::TimeZoneChanged {
                offset_secs: offset.local_minus_utc(),
            };
            if FACE_EVENTS.try_send(event).is_err() {
                defmt::warn!("Face event queue full, dropping time zone change");
            }
        }
        Err(err) => defmt::warn!("Rejected local time information: {}", err),
    }
}

fn on_data_item(bytes: &[u8]) {
    match DataItem::from_slice(bytes) {
        Ok(item) => {
            log_item(&item);
            if DATA_ITEMS.try_send(item).is_err() {
                defmt::warn!("Data item queue full, dropping item");
            }
        }
        Err(err) => defmt::warn!("Rejected data item: {}", err),
    }
}
