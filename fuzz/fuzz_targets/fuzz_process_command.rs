//! Fuzz target: `CommandProcessor::process_command`
//!
//! Arbitrary request buffers against a node with scalar and array methods.
//! Dispatch must never panic, a rejected request must never reach a
//! method, and the reported length must fit the buffer.
//!
//! cargo fuzz run fuzz_process_command

#![no_main]

use std::sync::OnceLock;

use libfuzzer_sys::fuzz_target;
use nanorpc::rpc::{Call, CommandProcessor, ReturnSlot};
use nanorpc::schema::{AtomType, InterfaceDescription, MethodSignature, TypeSpec};
use nanorpc::{HandlerError, Protocol, ProtocolConfig};

fn protocol() -> &'static Protocol {
    static PROTOCOL: OnceLock<Protocol> = OnceLock::new();
    PROTOCOL.get_or_init(|| {
        let iface = InterfaceDescription::new(vec![
            MethodSignature::new("ping"),
            MethodSignature::new("scale")
                .arg("values", TypeSpec::Array(AtomType::Float32))
                .arg("factor", TypeSpec::Scalar(AtomType::Float32))
                .returns(TypeSpec::Array(AtomType::Float32)),
            MethodSignature::new("pair")
                .arg("a", TypeSpec::Array(AtomType::Uint16))
                .arg("b", TypeSpec::Array(AtomType::Int8))
                .returns(TypeSpec::Scalar(AtomType::Uint32)),
        ]);
        Protocol::build(&[iface], ProtocolConfig::default()).expect("valid protocol")
    })
}

fn node(call: &Call<'_>, ret: &mut ReturnSlot<'_>) -> Result<(), HandlerError> {
    match call.name {
        "ping" => Ok(()),
        "scale" => {
            let factor = call.scalar::<f32>(1)?;
            let out: Vec<f32> = call.array(0)?.iter_as::<f32>().map(|v| v * factor).collect();
            ret.set_array(&out)
        }
        "pair" => ret.set((call.array(0)?.len() + call.array(1)?.len()) as u32),
        _ => Err(HandlerError::Failed),
    }
}

fuzz_target!(|data: &[u8]| {
    let mut processor: CommandProcessor<'_, _> = CommandProcessor::new(protocol(), node);
    let mut buf = [0u8; 80];
    let len = data.len().min(buf.len());
    buf[..len].copy_from_slice(&data[..len]);

    match processor.process_command(&mut buf, len) {
        Ok(n) => assert!(n <= buf.len()),
        Err(_) => assert_eq!(processor.stats().processed, 0),
    }
});
