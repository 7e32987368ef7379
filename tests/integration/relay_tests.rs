//! I2C relay: backoff schedule, failure modes, and a live secondary.

use nanorpc::protocol::FORWARD_I2C_REQUEST;
use nanorpc::relay::{I2cRelay, NoDelay};
use nanorpc::rpc::{CommandProcessor, FramedTransport, Proxy};
use nanorpc::schema::Value;
use nanorpc::{DeviceErrorCode, DispatchError, ProtocolConfig, ProxyError, RelayError};

use crate::mock_hw::{Board, NodeLink, RecordingDelay, ScriptedSlave, SecondaryBus, board_protocol};

const SECONDARY: u8 = 0x21;

fn relay(slave: ScriptedSlave) -> I2cRelay<ScriptedSlave, RecordingDelay> {
    I2cRelay::new(slave, RecordingDelay::default(), &ProtocolConfig::default())
}

#[test]
fn six_not_ready_polls_then_length() {
    let mut r = relay(ScriptedSlave::new(SECONDARY, 6, &[1, 2, 3, 4]));
    let mut out = [0u8; 32];

    assert_eq!(r.forward(SECONDARY, &[0x80], &mut out), Ok(4));
    assert_eq!(&out[..4], &[1, 2, 3, 4]);

    let (slave, delay) = r.into_parts();
    assert_eq!(slave.polls, 7);
    assert_eq!(slave.data_reads, 1);
    assert_eq!(slave.writes, vec![vec![0x80]]);
    assert_eq!(delay.ms, vec![1, 1, 1, 1, 1, 10, 10]);
}

#[test]
fn never_ready_exhausts_budget() {
    let mut r = relay(ScriptedSlave::new(SECONDARY, usize::MAX - 1, &[]));
    let mut out = [0u8; 32];

    assert_eq!(
        r.forward(SECONDARY, &[0x80], &mut out),
        Err(RelayError::I2cTimeout { attempts: 21 })
    );
    let (slave, delay) = r.into_parts();
    assert_eq!(slave.polls, 21);
    assert_eq!(slave.data_reads, 0);
    assert_eq!(delay.ms.len(), 21);
    assert_eq!(&delay.ms[9..12], &[10, 10, 20]);
    assert_eq!(delay.ms[20], 10_240);
}

#[test]
fn length_above_transfer_limit_is_invalid() {
    let mut slave = ScriptedSlave::new(SECONDARY, 0, &[]);
    slave.length = Some(33);
    let mut r = relay(slave);
    assert_eq!(
        r.forward(SECONDARY, &[0x80], &mut [0u8; 64]),
        Err(RelayError::I2cInvalidLength(33))
    );
}

#[test]
fn short_data_read_is_reported() {
    let mut slave = ScriptedSlave::new(SECONDARY, 0, &[9, 9, 9, 9]);
    slave.deliver = Some(2);
    let mut r = relay(slave);
    assert_eq!(
        r.forward(SECONDARY, &[0x80], &mut [0u8; 32]),
        Err(RelayError::I2cShortRead {
            expected: 4,
            actual: 2
        })
    );
}

#[test]
fn missing_secondary_fails_on_write() {
    let mut r = relay(ScriptedSlave::new(SECONDARY, 0, &[]));
    assert_eq!(
        r.forward(0x55, &[0x80], &mut [0u8; 32]),
        Err(RelayError::I2cWriteFailed(2))
    );
    assert!(r.delay_mut().ms.is_empty());
}

#[test]
fn oversized_payload_never_touches_bus() {
    let mut r = relay(ScriptedSlave::new(SECONDARY, 0, &[]));
    assert_eq!(
        r.forward(SECONDARY, &[0u8; 33], &mut [0u8; 32]),
        Err(RelayError::I2cWriteFailed(1))
    );
    assert!(r.bus_mut().writes.is_empty());
}

#[test]
fn processor_returns_relayed_bytes_verbatim() {
    let p = board_protocol();
    let slave = ScriptedSlave::new(SECONDARY, 2, &[0xAA, 0xBB, 0xCC]);
    let mut proc: CommandProcessor<'_, _, _, _> = CommandProcessor::with_relay(&p, Board::default(), relay(slave));

    // forward_i2c_request(0x21, [0x80])
    let mut buf = [0u8; 80];
    buf[..7].copy_from_slice(&[FORWARD_I2C_REQUEST, SECONDARY, 1, 0, 0, 0, 0x80]);
    assert_eq!(proc.process_command(&mut buf, 7), Ok(3));
    assert_eq!(&buf[..3], &[0xAA, 0xBB, 0xCC]);
    assert_eq!(proc.node().calls, 0);
    assert_eq!(proc.relay_mut().bus_mut().writes, vec![vec![0x80]]);
}

#[test]
fn relay_failure_reaches_processor_caller() {
    let p = board_protocol();
    let slave = ScriptedSlave::new(SECONDARY, usize::MAX - 1, &[]);
    let mut proc: CommandProcessor<'_, _, _, _> = CommandProcessor::with_relay(&p, Board::default(), relay(slave));

    let mut buf = [0u8; 80];
    buf[..7].copy_from_slice(&[FORWARD_I2C_REQUEST, SECONDARY, 1, 0, 0, 0, 0x80]);
    assert_eq!(
        proc.process_command(&mut buf, 7),
        Err(DispatchError::Relay(RelayError::I2cTimeout { attempts: 21 }))
    );
}

#[test]
fn host_calls_method_on_live_secondary() {
    let p = board_protocol();
    let secondary = SecondaryBus::new(SECONDARY, &p, Board::default(), 3);
    let relay = I2cRelay::new(secondary, NoDelay, p.config());
    let primary: CommandProcessor<'_, _, _, _> = CommandProcessor::with_relay(&p, Board::default(), relay);

    let link = NodeLink::new(primary);
    let mut proxy = Proxy::new(&p, FramedTransport::<_, 256>::new(link));

    let sum = proxy
        .call_remote(SECONDARY, "add", &[Value::from(40i32), Value::from(2i32)])
        .unwrap();
    assert_eq!(sum, Some(Value::from(42i32)));

    proxy.call_remote(SECONDARY, "set_led", &[Value::from(true)]).unwrap();

    let link = proxy.into_transport().into_channel();
    assert_eq!(link.processor.node().calls, 0);
    let mut primary = link.processor;
    let secondary = primary.relay_mut().bus_mut();
    assert!(secondary.processor.node().led);
    assert_eq!(secondary.processor.node().calls, 2);
}

#[test]
fn secondary_failure_surfaces_as_empty_reply() {
    let p = board_protocol();
    let secondary = SecondaryBus::new(SECONDARY, &p, Board::default(), 0);
    let relay = I2cRelay::new(secondary, NoDelay, p.config());
    let primary: CommandProcessor<'_, _, _, _> = CommandProcessor::with_relay(&p, Board::default(), relay);
    let mut proxy = Proxy::new(&p, FramedTransport::<_, 256>::new(NodeLink::new(primary)));

    // The secondary does not know 0x00; it answers with zero bytes.
    assert_eq!(proxy.forward_i2c_request(SECONDARY, &[0x00]), Ok(vec![]));

    // The secondary keeps serving after the failed request.
    assert_eq!(
        proxy.call_remote(SECONDARY, "ram_free", &[]),
        Ok(Some(Value::from(1234u16)))
    );
    assert_eq!(
        proxy.forward_i2c_request(0x30, &[0x80]),
        Err(ProxyError::Rejected(DeviceErrorCode::I2cWriteFailed(2)))
    );
}

#[test]
fn payload_at_transfer_limit_is_relayed() {
    let p = board_protocol();
    let slave = ScriptedSlave::new(SECONDARY, 0, &[7]);
    let primary: CommandProcessor<'_, _, _, _> = CommandProcessor::with_relay(&p, Board::default(), relay(slave));
    let mut proxy = Proxy::new(&p, FramedTransport::<_, 256>::new(NodeLink::new(primary)));

    // 1 code + 5 struct + 32 payload fits the default 80-byte node buffer.
    let payload = [0x5Au8; 32];
    assert_eq!(proxy.forward_i2c_request(SECONDARY, &payload), Ok(vec![7]));

    let mut link = proxy.into_transport().into_channel();
    assert_eq!(link.processor.relay_mut().bus_mut().writes, vec![payload.to_vec()]);
}
