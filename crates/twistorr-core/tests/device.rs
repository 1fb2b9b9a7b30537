mod common;

use common::{fast_config, read_reply, reply_frame, reply_frame_from, Response, ScriptedTransport};
use pretty_assertions::assert_eq;
use twistorr_core::device::commands::{PressureUnit, WriteStatus};
use twistorr_core::device::{DeviceError, TwisTorr};
use twistorr_core::protocol::{Addressing, QueryEngine, QueryError};

fn pump(script: Vec<Response>) -> TwisTorr<ScriptedTransport> {
    let engine = QueryEngine::with_config(
        ScriptedTransport::new(script),
        Addressing::PointToPoint,
        fast_config(2),
    );
    TwisTorr::new(engine, 0).unwrap()
}

fn writes(pump: &TwisTorr<ScriptedTransport>) -> &[Vec<u8>] {
    &pump.engine().transport().writes
}

#[test]
fn test_start_sends_window_zero_on() {
    let mut pump = pump(vec![Response::bytes(reply_frame(&[0x06]))]);
    pump.start().unwrap();
    assert_eq!(
        writes(&pump),
        &[vec![0x02, 0x80, b'0', b'0', b'0', b'1', b'1', 0x03, b'B', b'3']]
    );
}

#[test]
fn test_stop_rejected_by_nack() {
    let mut pump = pump(vec![Response::bytes(reply_frame(&[0x15]))]);
    match pump.stop().unwrap_err() {
        DeviceError::Rejected { window, status } => {
            assert_eq!(window.number(), 0);
            assert_eq!(status, WriteStatus::Nack);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(&writes(&pump)[0][2..7], b"00010");
}

#[test]
fn test_read_pressure() {
    let mut pump = pump(vec![Response::bytes(read_reply(224, b"  5.3E-07"))]);
    let pressure = pump.read_pressure().unwrap();
    assert!((pressure.value - 5.3e-7).abs() < 1e-15);
    assert_eq!(&writes(&pump)[0][2..6], b"2240");
}

#[test]
fn test_read_pressure_garbage_value() {
    let mut pump = pump(vec![Response::bytes(read_reply(224, b"ERR"))]);
    assert!(matches!(
        pump.read_pressure(),
        Err(DeviceError::InvalidValue { .. })
    ));
}

#[test]
fn test_set_pressure_unit() {
    let mut pump = pump(vec![Response::bytes(reply_frame(&[0x06]))]);
    pump.set_pressure_unit(PressureUnit::Torr).unwrap();
    assert_eq!(&writes(&pump)[0][2..12], b"1631000002");
}

#[test]
fn test_read_pressure_unit() {
    let mut pump = pump(vec![Response::bytes(read_reply(163, b"000001"))]);
    assert_eq!(pump.read_pressure_unit().unwrap(), PressureUnit::Pa);
}

#[test]
fn test_write_out_of_range() {
    let mut pump = pump(vec![Response::bytes(reply_frame(&[0x34]))]);
    assert!(matches!(
        pump.write_numeric(120, 999_999),
        Err(DeviceError::Rejected {
            status: WriteStatus::OutOfRange,
            ..
        })
    ));
}

#[test]
fn test_read_unknown_window() {
    let mut pump = pump(vec![Response::bytes(reply_frame(&[0x32]))]);
    assert!(matches!(
        pump.read_window(998),
        Err(DeviceError::Rejected {
            status: WriteStatus::UnknownWindow,
            ..
        })
    ));
}

#[test]
fn test_read_echo_mismatch() {
    let mut pump = pump(vec![Response::bytes(read_reply(205, b"000005"))]);
    assert!(matches!(
        pump.read_numeric(204),
        Err(DeviceError::UnexpectedReply { .. })
    ));
}

#[test]
fn test_checksum_failure_not_retried() {
    let mut frame = reply_frame(&[0x06]);
    let last = frame.len() - 1;
    frame[last] = b'X';
    let mut pump = pump(vec![
        Response::bytes(frame),
        Response::bytes(reply_frame(&[0x06])),
    ]);

    assert!(matches!(
        pump.start(),
        Err(DeviceError::Integrity { .. })
    ));
    assert_eq!(writes(&pump).len(), 1);
}

#[test]
fn test_logic_read() {
    let mut pump = pump(vec![
        Response::bytes(read_reply(0, b"1")),
        Response::bytes(read_reply(0, b"7")),
    ]);
    assert!(pump.is_started().unwrap());
    assert!(matches!(
        pump.is_started(),
        Err(DeviceError::InvalidValue { .. })
    ));
}

#[test]
fn test_silent_controller_surfaces_exhausted() {
    let mut pump = pump(vec![]);
    assert!(matches!(
        pump.read_pressure(),
        Err(DeviceError::Query(QueryError::Exhausted { attempts: 2, .. }))
    ));
}

#[test]
fn test_devno_checked_against_addressing() {
    let engine = QueryEngine::new(ScriptedTransport::new(vec![]), Addressing::PointToPoint);
    assert!(TwisTorr::new(engine, 2).is_err());
}

#[test]
fn test_multidrop_controller() {
    let engine = QueryEngine::with_config(
        ScriptedTransport::new(vec![Response::bytes(reply_frame_from(3, &[0x06]))]),
        Addressing::MultiDrop,
        fast_config(1),
    );
    let mut pump = TwisTorr::new(engine, 3).unwrap();
    pump.start().unwrap();
    assert_eq!(writes(&pump)[0][1], 0x83);
}

#[test]
fn test_multidrop_reply_from_other_device_rejected() {
    let engine = QueryEngine::with_config(
        ScriptedTransport::new(vec![Response::bytes(reply_frame_from(4, &[0x06]))]),
        Addressing::MultiDrop,
        fast_config(1),
    );
    let mut pump = TwisTorr::new(engine, 3).unwrap();
    assert!(matches!(
        pump.start(),
        Err(DeviceError::UnexpectedReply { .. })
    ));
}

#[test]
fn test_read_answered_by_ack_is_unexpected() {
    let mut pump = pump(vec![Response::bytes(reply_frame(&[0x06]))]);
    assert!(matches!(
        pump.read_window(224),
        Err(DeviceError::UnexpectedReply { .. })
    ));
}
