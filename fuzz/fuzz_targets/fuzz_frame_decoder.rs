//! Fuzz target: `FrameDecoder::feed`
//!
//! Drives arbitrary byte sequences into the streaming frame decoder, split
//! at a fuzzer-chosen point, and asserts that it never panics, always
//! makes progress, and never yields a payload above its ceiling.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use nanorpc::rpc::codec::FrameDecoder;

const CEILING: usize = 64;

fuzz_target!(|data: &[u8]| {
    let Some((&split, data)) = data.split_first() else {
        return;
    };
    let split = usize::from(split).min(data.len());
    let mut decoder = FrameDecoder::<CEILING>::new();

    for mut chunk in [&data[..split], &data[split..]] {
        while !chunk.is_empty() {
            let (used, frame) = decoder.feed(chunk);
            assert!(used > 0, "decoder must consume input");
            assert!(used <= chunk.len());
            if let Some(frame) = frame {
                assert!(frame.payload.len() <= CEILING, "payload exceeds ceiling");
            }
            chunk = &chunk[used..];
        }
    }

    // After a reset the decoder must accept bytes cleanly again.
    decoder.reset();
    let _ = decoder.feed(data);
});
