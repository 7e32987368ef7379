//! Host proxy against a live node over the framed serial link.

use nanorpc::rpc::{Call, CommandProcessor, FramedTransport, Proxy, ReturnSlot, SharedProxy};
use nanorpc::schema::{Array, AtomType, Value};
use nanorpc::{
    DeviceErrorCode, HandlerError, InterfaceDescription, MethodSignature, Protocol, ProtocolConfig, ProxyError,
    TypeSpec,
};

use crate::mock_hw::{Board, NodeLink, board_interface, board_protocol};

type Link<'p> = NodeLink<'p, Board>;

fn link(p: &Protocol) -> FramedTransport<Link<'_>, 256> {
    FramedTransport::new(NodeLink::new(CommandProcessor::new(p, Board::default())))
}

#[test]
fn scalar_and_array_calls_round_trip() {
    let p = board_protocol();
    let mut proxy = Proxy::new(&p, link(&p));

    assert_eq!(proxy.call("ram_free", &[]), Ok(Some(Value::from(1234u16))));
    assert_eq!(
        proxy.call("add", &[Value::from(-5i32), Value::from(3i32)]),
        Ok(Some(Value::from(-2i32)))
    );
    assert_eq!(
        proxy.call("sum", &[Array::of(&[100i16, -1, 7]).into()]),
        Ok(Some(Value::from(106i32)))
    );
    assert_eq!(
        proxy.call("reverse", &[Array::of(&[1u8, 2, 3]).into()]),
        Ok(Some(Array::of(&[3u8, 2, 1]).into()))
    );
    assert_eq!(proxy.call("set_led", &[Value::from(true)]), Ok(None));

    let node = proxy.into_transport().into_channel();
    assert!(node.processor.node().led);
    assert_eq!(node.frames_answered, 5);
}

#[test]
fn empty_array_argument() {
    let p = board_protocol();
    let mut proxy = Proxy::new(&p, link(&p));
    assert_eq!(
        proxy.call("sum", &[Array::of::<i16>(&[]).into()]),
        Ok(Some(Value::from(0i32)))
    );
}

#[test]
fn argument_errors_are_caught_before_sending() {
    let p = board_protocol();
    let mut proxy = Proxy::new(&p, link(&p));

    assert_eq!(
        proxy.call("add", &[Value::from(1i32)]),
        Err(ProxyError::ArgumentCount {
            expected: 2,
            actual: 1
        })
    );
    assert_eq!(
        proxy.call("add", &[Value::from(1i32), Value::from(1u8)]),
        Err(ProxyError::ArgumentType {
            index: 1,
            expected: TypeSpec::Scalar(AtomType::Int32),
            actual: TypeSpec::Scalar(AtomType::Uint8),
        })
    );
    assert_eq!(proxy.into_transport().into_channel().frames_answered, 0);
}

#[test]
fn node_rejection_is_raised() {
    // The host knows one more method than the node.
    let mut host_iface = board_interface();
    host_iface
        .methods
        .push(MethodSignature::new("reboot").returns(TypeSpec::Scalar(AtomType::Bool)));
    let host = Protocol::build(&[host_iface], ProtocolConfig::default()).unwrap();
    let node = board_protocol();

    let mut proxy = Proxy::new(&host, link(&node));
    assert_eq!(
        proxy.call("reboot", &[]),
        Err(ProxyError::Rejected(DeviceErrorCode::UnknownCommand(0x85)))
    );
    // The node is still usable.
    assert_eq!(proxy.call("ram_free", &[]), Ok(Some(Value::from(1234u16))));
}

#[test]
fn later_source_shadows_echo() {
    let first = InterfaceDescription::new(vec![
        MethodSignature::new("echo")
            .arg("x", TypeSpec::Scalar(AtomType::Uint8))
            .returns(TypeSpec::Scalar(AtomType::Uint8)),
        MethodSignature::new("first_only"),
    ]);
    let second = InterfaceDescription::new(vec![
        MethodSignature::new("echo")
            .arg("data", TypeSpec::Array(AtomType::Uint8))
            .returns(TypeSpec::Array(AtomType::Uint8)),
    ]);
    let p = Protocol::build(&[first, second], ProtocolConfig::default()).unwrap();

    let echo = p.command_by_name("echo").unwrap();
    assert_eq!(echo.code(), 0xA0);
    assert!(p.command(0x80).is_none());
    assert_eq!(p.command_by_name("first_only").unwrap().code(), 0x81);

    let node = |call: &Call<'_>, ret: &mut ReturnSlot<'_>| -> Result<(), HandlerError> {
        ret.set_array_bytes(AtomType::Uint8, call.array(0)?.as_bytes())
    };
    let transport: FramedTransport<_, 256> =
        FramedTransport::new(NodeLink::new(CommandProcessor::new(&p, node)));
    let mut proxy = Proxy::new(&p, transport);
    assert_eq!(
        proxy.call("echo", &[Array::of(&[9u8, 8]).into()]),
        Ok(Some(Array::of(&[9u8, 8]).into()))
    );
}

#[test]
fn second_array_offset_counts_first_arrays_bytes() {
    let iface = InterfaceDescription::new(vec![
        MethodSignature::new("dot")
            .arg("a", TypeSpec::Array(AtomType::Int32))
            .arg("b", TypeSpec::Array(AtomType::Int32))
            .returns(TypeSpec::Scalar(AtomType::Int32)),
    ]);
    let p = Protocol::build(&[iface], ProtocolConfig::default()).unwrap();

    let node = |call: &Call<'_>, ret: &mut ReturnSlot<'_>| -> Result<(), HandlerError> {
        let a = call.array(0)?;
        let b = call.array(1)?;
        ret.set(a.iter_as::<i32>().zip(b.iter_as::<i32>()).map(|(x, y)| x * y).sum::<i32>())
    };
    let transport: FramedTransport<_, 256> =
        FramedTransport::new(NodeLink::new(CommandProcessor::new(&p, node)));
    let mut proxy = Proxy::new(&p, transport);

    let result = proxy.call(
        "dot",
        &[
            Array::of(&[1i32, 2, 3]).into(),
            Array::of(&[4i32, 5, 6, 7, 8]).into(),
        ],
    );
    assert_eq!(result, Ok(Some(Value::from(32i32))));
}

#[test]
fn shared_proxy_serializes_threads() {
    let p = board_protocol();
    let shared = SharedProxy::new(Proxy::new(&p, link(&p)));

    std::thread::scope(|s| {
        for t in 0..4i32 {
            let shared = &shared;
            s.spawn(move || {
                for i in 0..10i32 {
                    let r = shared.call("add", &[Value::from(t * 100), Value::from(i)]);
                    assert_eq!(r, Ok(Some(Value::from(t * 100 + i))));
                }
            });
        }
    });

    let node = shared.into_inner().into_transport().into_channel();
    assert_eq!(node.frames_answered, 40);
    assert_eq!(node.processor.node().calls, 40);
}
