//! Sequence-to-timings composer.
//!
//! The inverse of decoding: renders a symbolic signal back into the flat
//! pulse-duration list a transmitter replays. Each code slot contributes
//! the midpoint of its current acceptance window; the list is terminated
//! by a zero sentinel.

use crate::capture::CodeTime;
use crate::decoder::{DecodedEvent, SignalDecoder};

/// Maximum number of durations in one transmit burst, including the
/// terminating zero.
pub const MAX_BURST_LEN: usize = 256;

/// Render `signal` (`"<protocol-name> <sequence>"`) into `timings`.
///
/// Returns the number of durations written, excluding the zero sentinel.
/// An unknown protocol, a malformed signal or an empty output buffer
/// yields 0; sequence characters without a matching code are skipped, as
/// are timings that would not leave room for the sentinel.
pub fn compose(decoder: &SignalDecoder, signal: &str, timings: &mut [CodeTime]) -> usize {
    if timings.is_empty() {
        return 0;
    }

    let Some(event) = DecodedEvent::parse(signal) else {
        timings[0] = 0;
        return 0;
    };
    let Some(protocol) = decoder.protocol(event.protocol()) else {
        timings[0] = 0;
        return 0;
    };

    let mut n = 0;
    for name in event.sequence().chars() {
        let Some(code) = protocol.code(name) else { continue };

        for slot in 0..code.slots() {
            if n + 1 >= timings.len() {
                timings[n] = 0;
                return n;
            }
            let (min, max) = code.window(slot);
            timings[n] = (min + max) / 2;
            n += 1;
        }
    }
    timings[n] = 0;
    n
}
