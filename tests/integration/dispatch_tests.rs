//! Node-side dispatch against raw request buffers.

use nanorpc::rpc::{Call, CommandProcessor, DispatchState, ERROR_SENTINEL, ReturnSlot};
use nanorpc::{DispatchError, HandlerError};

use crate::mock_hw::{Board, board_protocol};

fn request(bytes: &[u8]) -> ([u8; 80], usize) {
    let mut buf = [0u8; 80];
    buf[..bytes.len()].copy_from_slice(bytes);
    (buf, bytes.len())
}

#[test]
fn unknown_code_leaves_node_ready() {
    let p = board_protocol();
    let mut proc: CommandProcessor<'_, _> = CommandProcessor::new(&p, Board::default());

    let (mut buf, len) = request(&[0x00]);
    assert_eq!(proc.process(&mut buf, len), ERROR_SENTINEL);
    assert_eq!(proc.last_state(), DispatchState::Error);
    assert_eq!(proc.node().calls, 0);

    // add(40, 2)
    let (mut buf, len) = request(&[0x81, 40, 0, 0, 0, 2, 0, 0, 0]);
    assert_eq!(proc.process(&mut buf, len), 4);
    assert_eq!(&buf[..4], &42i32.to_le_bytes());
    assert_eq!(proc.last_state(), DispatchState::Done);
    assert_eq!(proc.node().calls, 1);
    assert_eq!(proc.stats().rejected, 1);
    assert_eq!(proc.stats().processed, 1);
}

#[test]
fn array_past_request_end_never_reaches_method() {
    let p = board_protocol();
    let mut proc: CommandProcessor<'_, _> = CommandProcessor::new(&p, Board::default());

    // sum: 3 elements claimed, only 2 present
    let (mut buf, len) = request(&[0x82, 3, 0, 0, 0, 1, 0, 2, 0]);
    assert_eq!(proc.process(&mut buf, len), ERROR_SENTINEL);
    assert_eq!(proc.node().calls, 0);

    // offset pushes the slice out
    let (mut buf, len) = request(&[0x82, 2, 0, 2, 0, 1, 0, 2, 0]);
    assert!(matches!(
        proc.process_command(&mut buf, len),
        Err(DispatchError::MalformedRequest(_))
    ));
    assert_eq!(proc.node().calls, 0);
}

#[test]
fn bytes_beyond_request_len_are_not_read() {
    let p = board_protocol();
    let mut proc: CommandProcessor<'_, _> = CommandProcessor::new(&p, Board::default());

    // The buffer holds the array bytes but request_len stops short of them.
    let (mut buf, _) = request(&[0x82, 1, 0, 0, 0, 5, 0]);
    assert_eq!(proc.process(&mut buf, 5), ERROR_SENTINEL);
}

#[test]
fn array_sum_uses_relative_offset() {
    let p = board_protocol();
    let mut proc: CommandProcessor<'_, _> = CommandProcessor::new(&p, Board::default());

    // data_offset 2 skips the first element of the trailing region
    let (mut buf, len) = request(&[0x82, 2, 0, 2, 0, 0xFF, 0x7F, 10, 0, 0xF6, 0xFF]);
    assert_eq!(proc.process(&mut buf, len), 4);
    assert_eq!(&buf[..4], &0i32.to_le_bytes());
}

#[test]
fn array_response_has_no_header() {
    let p = board_protocol();
    let mut proc: CommandProcessor<'_, _> = CommandProcessor::new(&p, Board::default());

    let (mut buf, len) = request(&[0x83, 4, 0, 0, 0, b'a', b'b', b'c', b'd']);
    assert_eq!(proc.process(&mut buf, len), 4);
    assert_eq!(&buf[..4], b"dcba");
}

#[test]
fn void_method_writes_nothing_and_mutates_node() {
    let p = board_protocol();
    let mut proc: CommandProcessor<'_, _> = CommandProcessor::new(&p, Board::default());

    let (mut buf, len) = request(&[0x84, 7]);
    assert_eq!(proc.process(&mut buf, len), 0);
    assert!(proc.node().led);
}

#[test]
fn handler_type_confusion_is_an_error_not_a_panic() {
    let p = board_protocol();
    let mut proc: CommandProcessor<'_, _> = CommandProcessor::new(
        &p,
        // ram_free is declared uint16; answer with an int32
        |_: &Call<'_>, ret: &mut ReturnSlot<'_>| ret.set(5i32),
    );
    let (mut buf, len) = request(&[0x80]);
    assert_eq!(
        proc.process_command(&mut buf, len),
        Err(DispatchError::Handler(HandlerError::ReturnMismatch))
    );
}

#[test]
fn response_larger_than_buffer_overflows() {
    let p = board_protocol();
    let mut proc: CommandProcessor<'_, _> = CommandProcessor::new(&p, Board::default());

    // One-byte buffer: room for the request, not for the uint16 reply.
    let mut buf = [0x80u8];
    assert_eq!(
        proc.process_command(&mut buf, 1),
        Err(DispatchError::ResponseOverflow {
            needed: 2,
            capacity: 1
        })
    );
}
