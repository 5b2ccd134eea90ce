//! Multi-protocol signal decoder.
//!
//! The decoder owns a fixed-capacity set of loaded [`Protocol`]s and feeds
//! every captured duration to each of them. Protocols keep independent
//! sessions, so a duration that continues one protocol's sequence may at
//! the same time open another's.
//!
//! Completed sequences are delivered to an injected [`DecodeListener`] in
//! the two-token symbolic format `"<protocol-name> <sequence>"`. A
//! [`DuplicateFilter`] sits between the decoder output and the command
//! layer to drop physical retransmissions of a single button press.

use crate::capture::CodeTime;
use crate::logging::LogStream;
use crate::protocol::{Code, ParseOutcome, Protocol, MAX_SEQUENCE_LEN, PROTOCOL_NAME_LEN};
use crate::rf_debug;

/// Maximum number of simultaneously loaded protocols.
pub const MAX_PROTOCOLS: usize = 8;

/// Maximum length of a decoded event string: name, space, sequence.
pub const MAX_EVENT_LEN: usize = PROTOCOL_NAME_LEN + 1 + MAX_SEQUENCE_LEN;

/// A completed decode in the symbolic `"<protocol-name> <sequence>"` format.
#[derive(Clone, Copy)]
pub struct DecodedEvent {
    buf: [u8; MAX_EVENT_LEN],
    len: usize,
    split: usize,
}

impl DecodedEvent {
    /// Build an event from a protocol name and sequence.
    pub fn new(protocol: &str, sequence: &str) -> Self {
        let mut buf = [0; MAX_EVENT_LEN];
        let name_len = protocol.len().min(PROTOCOL_NAME_LEN);
        let seq_len = sequence.len().min(MAX_SEQUENCE_LEN);

        buf[..name_len].copy_from_slice(&protocol.as_bytes()[..name_len]);
        buf[name_len] = b' ';
        buf[name_len + 1..name_len + 1 + seq_len]
            .copy_from_slice(&sequence.as_bytes()[..seq_len]);

        Self {
            buf,
            len: name_len + 1 + seq_len,
            split: name_len,
        }
    }

    /// Parse a `"<protocol-name> <sequence>"` string into an event.
    ///
    /// Returns `None` when the space separator is missing.
    pub fn parse(signal: &str) -> Option<Self> {
        let split = signal.find(' ')?;
        Some(Self::new(&signal[..split], &signal[split + 1..]))
    }

    /// Full event string.
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }

    /// Protocol name token.
    pub fn protocol(&self) -> &str {
        &self.as_str()[..self.split]
    }

    /// Sequence token.
    pub fn sequence(&self) -> &str {
        &self.as_str()[self.split + 1..]
    }
}

impl PartialEq for DecodedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for DecodedEvent {}

impl core::fmt::Debug for DecodedEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("DecodedEvent").field(&self.as_str()).finish()
    }
}

/// Capability: accepts a decoded event.
pub trait DecodeListener {
    fn on_decoded(&mut self, event: &DecodedEvent);
}

impl<F: FnMut(&DecodedEvent)> DecodeListener for F {
    fn on_decoded(&mut self, event: &DecodedEvent) {
        self(event)
    }
}

/// Per-protocol state machines over the shared duration stream.
pub struct SignalDecoder {
    protocols: [Option<Protocol>; MAX_PROTOCOLS],
    count: usize,
}

impl SignalDecoder {
    /// Create a decoder with no protocols loaded.
    pub const fn new() -> Self {
        const EMPTY: Option<Protocol> = None;
        Self {
            protocols: [EMPTY; MAX_PROTOCOLS],
            count: 0,
        }
    }

    /// Load a protocol. Returns `false` when the table is full.
    ///
    /// The protocol starts with an empty session and nominal windows.
    pub fn load(&mut self, mut protocol: Protocol) -> bool {
        if self.count == MAX_PROTOCOLS {
            return false;
        }
        protocol.reset_session();
        self.protocols[self.count] = Some(protocol);
        self.count += 1;
        true
    }

    /// Number of loaded protocols.
    pub fn protocol_count(&self) -> usize {
        self.count
    }

    /// Look up a loaded protocol by name.
    pub fn protocol(&self, name: &str) -> Option<&Protocol> {
        self.protocols[..self.count]
            .iter()
            .flatten()
            .find(|p| p.name() == name)
    }

    /// Number of burst repeats for transmitting the named protocol, 0 when
    /// it is not loaded.
    pub fn send_repeat(&self, name: &str) -> u32 {
        self.protocol(name).map_or(0, |p| p.send_repeat)
    }

    /// Render the loaded protocol tables through the log stream.
    ///
    /// Diagnostics for the serial console; shows the acceptance windows
    /// currently in effect, including any recalibration.
    pub fn dump_table<const N: usize>(&self, stream: &LogStream<N>, now_us: i64) {
        for protocol in self.protocols[..self.count].iter().flatten() {
            rf_debug!(
                stream,
                now_us,
                "protocol '{}' min:{} max:{} tol:{} rep:{}",
                protocol.name(),
                protocol.min_len,
                protocol.max_len,
                protocol.tolerance,
                protocol.send_repeat
            );
            for code in protocol.codes() {
                rf_debug!(stream, now_us, "  '{}' |{}", code.name, Windows(code));
            }
        }
    }

    /// Feed one duration to every loaded protocol, delivering completed
    /// sequences to `listener`.
    pub fn feed<L: DecodeListener>(&mut self, duration: CodeTime, listener: &mut L) {
        for slot in self.protocols[..self.count].iter_mut() {
            let Some(protocol) = slot else { continue };

            if protocol.parse(duration) == ParseOutcome::Complete {
                let event = DecodedEvent::new(protocol.name(), protocol.sequence());
                protocol.reset_session();
                listener.on_decoded(&event);
            }
        }
    }
}

impl Default for SignalDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Formats a code's acceptance windows for the table dump.
struct Windows<'a>(&'a Code);

impl core::fmt::Display for Windows<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for slot in 0..self.0.slots() {
            let (min, max) = self.0.window(slot);
            write!(f, " {}-{} |", min, max)?;
        }
        Ok(())
    }
}

/// Short-window filter for identical decoded strings.
///
/// Cheap remotes transmit a burst of repeats per key press and line noise
/// can re-trigger a decode; an identical event inside the window is the
/// same press, not a new one. This is separate from hold-detection, which
/// runs on a longer window per relay in the pairing gate.
pub struct DuplicateFilter {
    last: Option<DecodedEvent>,
    last_ms: u32,
    window_ms: u32,
}

impl DuplicateFilter {
    pub const fn new(window_ms: u32) -> Self {
        Self {
            last: None,
            last_ms: 0,
            window_ms,
        }
    }

    /// Returns `true` when the event is a fresh press that should be
    /// forwarded, `false` when it duplicates the previous one.
    pub fn accept(&mut self, event: &DecodedEvent, now_ms: u32) -> bool {
        if let Some(last) = &self.last {
            if last == event && now_ms.wrapping_sub(self.last_ms) < self.window_ms {
                return false;
            }
        }
        self.last = Some(*event);
        self.last_ms = now_ms;
        true
    }
}
