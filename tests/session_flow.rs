//! End-to-end session behavior through the public API.

use bytes::Bytes;
use chrono::NaiveDate;
use health_thermometer_ble::ble::uuids::*;
use health_thermometer_ble::protocol::{decode, encode};
use health_thermometer_ble::{
    CharacteristicHandle, DecodeError, GattTransport, ServiceCatalog, Session, SessionError,
    SessionEvent, SessionState, TemperatureMeasurement, TemperatureType, TemperatureUnit,
    TransportError, TransportEvent,
};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

/// Records every request the session makes.
#[derive(Default)]
struct RecordingTransport {
    requests: Vec<String>,
}

impl GattTransport for RecordingTransport {
    fn enable_indications(
        &mut self,
        characteristic: &CharacteristicHandle,
    ) -> Result<(), TransportError> {
        self.requests.push(format!("enable {}", characteristic.uuid()));
        Ok(())
    }

    fn disable_indications(
        &mut self,
        characteristic: &CharacteristicHandle,
    ) -> Result<(), TransportError> {
        self.requests.push(format!("disable {}", characteristic.uuid()));
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.requests.push("disconnect".to_string());
        Ok(())
    }
}

fn thermometer_catalog() -> ServiceCatalog {
    let battery = uuid::Uuid::from_u128(0x0000_180f_0000_1000_8000_00805f9b34fb);
    let battery_level = uuid::Uuid::from_u128(0x0000_2a19_0000_1000_8000_00805f9b34fb);
    ServiceCatalog::new()
        .with_service(battery, [battery_level])
        .with_service(HEALTH_THERMOMETER_SERVICE_UUID, [TEMPERATURE_MEASUREMENT_UUID])
}

fn recorded_session() -> (Session<RecordingTransport>, Arc<Mutex<Vec<SessionEvent>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut session = Session::new(RecordingTransport::default());
    let sink = seen.clone();
    session.add_listener(move |event: &SessionEvent| sink.lock().unwrap().push(event.clone()));
    (session, seen)
}

#[test]
fn thermometer_session_lifecycle() {
    let (mut session, seen) = recorded_session();

    session.handle_event(TransportEvent::Connected);
    session.handle_event(TransportEvent::ServicesDiscovered(thermometer_catalog()));
    assert_eq!(
        session.transport().requests,
        vec![format!("enable {}", TEMPERATURE_MEASUREMENT_UUID)]
    );
    session.handle_event(TransportEvent::SubscribeAcknowledged);

    let reading = TemperatureMeasurement::new(38.2, TemperatureUnit::Celsius)
        .with_type(TemperatureType::Tympanum)
        .with_timestamp(
            NaiveDate::from_ymd_opt(2025, 1, 15)
                .unwrap()
                .and_hms_opt(7, 45, 12)
                .unwrap(),
        );
    session.handle_event(TransportEvent::IndicationReceived(encode(&reading)));
    session.handle_event(TransportEvent::IndicationReceived(Bytes::from_static(&[
        0x02, 0x6E, 0x01, 0x00, 0xFF, 0xE9, 0x07, 13, 1, 0, 0, 0,
    ])));
    session.handle_event(TransportEvent::Disconnected);
    session.handle_event(TransportEvent::IndicationReceived(encode(&reading)));

    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(session.binding().handle().is_none());

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 4);
    assert_eq!(seen[0], SessionEvent::Connected);
    assert_eq!(seen[1], SessionEvent::MeasurementReceived(reading));
    assert!(matches!(
        seen[2],
        SessionEvent::Error(SessionError::MalformedPayload(
            DecodeError::InvalidTimestamp { month: 13, .. }
        ))
    ));
    assert_eq!(seen[3], SessionEvent::Disconnected);
}

#[test]
fn unsupported_device_reports_once() {
    let (mut session, seen) = recorded_session();

    session.handle_event(TransportEvent::Connected);
    session.handle_event(TransportEvent::ServicesDiscovered(
        ServiceCatalog::new().with_service(HEALTH_THERMOMETER_SERVICE_UUID, []),
    ));
    session.handle_event(TransportEvent::Disconnected);

    assert_eq!(session.transport().requests, vec!["disconnect".to_string()]);
    let errors = seen
        .lock()
        .unwrap()
        .iter()
        .filter(|e| matches!(e, SessionEvent::Error(_)))
        .count();
    assert_eq!(errors, 1);
    assert_eq!(
        seen.lock().unwrap().last(),
        Some(&SessionEvent::Disconnected)
    );
}

#[test]
fn decoder_handles_nordic_sample_packet() {
    // Flags: Fahrenheit, timestamp, type. 98.6 F, 2015-06-30 12:00:05, finger.
    let data = [
        0x07, 0xDA, 0x03, 0x00, 0xFF, 0xDF, 0x07, 0x06, 0x1E, 0x0C, 0x00, 0x05, 0x04,
    ];
    let m = decode(&data).unwrap();
    assert_eq!(m.temperature, 98.6);
    assert_eq!(m.unit, TemperatureUnit::Fahrenheit);
    assert_eq!(m.temperature_type, Some(TemperatureType::Finger));
    assert_eq!(
        m.timestamp,
        NaiveDate::from_ymd_opt(2015, 6, 30).and_then(|d| d.and_hms_opt(12, 0, 5))
    );
    assert!((m.celsius() - 37.0).abs() < 0.001);
}

#[test]
fn commands_respect_session_state() {
    let (mut session, _seen) = recorded_session();
    tokio_test::assert_err!(session.resubscribe());
    tokio_test::assert_err!(session.unsubscribe());

    session.handle_event(TransportEvent::Connected);
    session.handle_event(TransportEvent::ServicesDiscovered(thermometer_catalog()));
    session.handle_event(TransportEvent::SubscribeFailed {
        reason: "insufficient authentication".to_string(),
    });
    assert_eq!(session.state(), SessionState::ServiceReady);

    tokio_test::assert_ok!(session.resubscribe());
    session.handle_event(TransportEvent::SubscribeAcknowledged);
    tokio_test::assert_ok!(session.unsubscribe());
    assert_eq!(session.state(), SessionState::ServiceReady);

    let expected: Vec<String> = ["enable", "enable", "disable"]
        .iter()
        .map(|op| format!("{} {}", op, TEMPERATURE_MEASUREMENT_UUID))
        .collect();
    assert_eq!(session.transport().requests, expected);
}
