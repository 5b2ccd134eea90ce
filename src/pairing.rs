//! Remote pairing and relay command gate.
//!
//! Interprets decoded EV1527 events. An EV1527 frame is one start symbol,
//! a 20-bit transmitter address and a 4-bit data payload. The gate learns
//! an address during an externally triggered pairing window, afterwards
//! accepts only frames carrying that address, maps the payload to a relay
//! and toggles it, suppressing re-triggers from a held button.
//!
//! ```text
//!          start_learning          valid frame + stored
//!   Idle ──────────────▶ Learning ────────────────────▶ Paired
//!    ▲                      │                             │
//!    │      30s timeout     │            clear            │
//!    └──────────────────────┴─────────────────────────────┘
//! ```

use crate::config::{NUM_RELAYS, PAIRING_TIMEOUT_MS, RF_HOLD_TIMEOUT_MS};
use crate::decoder::DecodedEvent;
use crate::relay::RelayControl;
use crate::store::PairingStore;

/// Address field width in bits.
pub const ADDRESS_BITS: usize = 20;

/// Data field width in bits.
pub const DATA_BITS: usize = 4;

/// Sequence length of a well-formed EV1527 frame.
pub const EV1527_SEQ_LEN: usize = 1 + ADDRESS_BITS + DATA_BITS;

/// Protocol name the gate listens for.
const EV1527_NAME: &str = "ev1527";

/// Map a 4-bit data payload to a relay index.
///
/// One button per bit, transmitted MSB first: `1000` is button A.
pub fn relay_for_payload(data: u8) -> Option<usize> {
    match data {
        0x8 => Some(0),
        0x4 => Some(1),
        0x2 => Some(2),
        0x1 => Some(3),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GateState {
    /// Not paired, not learning.
    Idle,
    /// Pairing window open since the recorded timestamp.
    Learning { since_ms: u32 },
    /// Address on file, accepting commands.
    Paired,
}

/// What the gate did with a decoded event. The caller logs and counts;
/// the gate itself stays silent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateOutcome {
    /// Not an EV1527 frame, malformed, or the gate is idle.
    Ignored,
    /// Address learned and persisted; now paired.
    Learned,
    /// Persisting the learned address failed; still learning.
    StoreFailed,
    /// Frame address does not match the paired remote.
    AddressMismatch,
    /// Payload maps to no relay.
    UnmappedPayload,
    /// Same relay toggled too recently; button considered held.
    Held,
    /// Relay toggled to the given state.
    Toggled { relay: usize, on: bool },
}

/// Pairing state machine and per-relay hold tracking.
pub struct PairingGate {
    state: GateState,
    address: [u8; ADDRESS_BITS],
    last_toggle_ms: [Option<u32>; NUM_RELAYS],
    hold_timeout_ms: u32,
    learn_timeout_ms: u32,
}

impl PairingGate {
    pub const fn new() -> Self {
        Self {
            state: GateState::Idle,
            address: [0; ADDRESS_BITS],
            last_toggle_ms: [None; NUM_RELAYS],
            hold_timeout_ms: RF_HOLD_TIMEOUT_MS,
            learn_timeout_ms: PAIRING_TIMEOUT_MS,
        }
    }

    /// Override the hold and learning windows (tests, alternate boards).
    pub const fn with_timeouts(hold_timeout_ms: u32, learn_timeout_ms: u32) -> Self {
        Self {
            state: GateState::Idle,
            address: [0; ADDRESS_BITS],
            last_toggle_ms: [None; NUM_RELAYS],
            hold_timeout_ms,
            learn_timeout_ms,
        }
    }

    /// Restore pairing from the store at boot.
    pub fn load<S: PairingStore>(&mut self, store: &mut S) {
        if let Some(address) = store.address() {
            self.address = address;
            self.state = GateState::Paired;
        }
    }

    /// Open the pairing window. Only meaningful from idle; a paired gate
    /// must be cleared first.
    pub fn start_learning(&mut self, now_ms: u32) {
        if self.state == GateState::Idle {
            self.state = GateState::Learning { since_ms: now_ms };
        }
    }

    /// Erase the paired remote and return to idle.
    pub fn clear<S: PairingStore>(&mut self, store: &mut S) {
        let _ = store.erase_address();
        self.address = [0; ADDRESS_BITS];
        self.state = GateState::Idle;
    }

    /// Close the pairing window when it has expired. Called on a regular
    /// polling cadence; returns `true` when the window just closed.
    pub fn poll(&mut self, now_ms: u32) -> bool {
        if let GateState::Learning { since_ms } = self.state {
            if now_ms.wrapping_sub(since_ms) > self.learn_timeout_ms {
                self.state = GateState::Idle;
                return true;
            }
        }
        false
    }

    pub fn is_paired(&self) -> bool {
        self.state == GateState::Paired
    }

    pub fn is_learning(&self) -> bool {
        matches!(self.state, GateState::Learning { .. })
    }

    /// The paired address as a 20-character bit string.
    pub fn address(&self) -> Option<&str> {
        if self.is_paired() {
            core::str::from_utf8(&self.address).ok()
        } else {
            None
        }
    }

    /// Process one decoded event.
    pub fn on_decoded<S, R>(
        &mut self,
        event: &DecodedEvent,
        now_ms: u32,
        store: &mut S,
        relays: &mut R,
    ) -> GateOutcome
    where
        S: PairingStore,
        R: RelayControl,
    {
        if event.protocol() != EV1527_NAME {
            return GateOutcome::Ignored;
        }
        let Some((address, data)) = split_frame(event.sequence()) else {
            return GateOutcome::Ignored;
        };

        match self.state {
            GateState::Idle => GateOutcome::Ignored,

            GateState::Learning { .. } => match store.set_address(address) {
                Ok(()) => {
                    self.address = *address;
                    self.state = GateState::Paired;
                    GateOutcome::Learned
                }
                // Stay in Learning; a later frame inside the window retries
                Err(_) => GateOutcome::StoreFailed,
            },

            GateState::Paired => {
                if *address != self.address {
                    return GateOutcome::AddressMismatch;
                }
                let Some(relay) = relay_for_payload(data) else {
                    return GateOutcome::UnmappedPayload;
                };

                if let Some(last) = self.last_toggle_ms[relay] {
                    if now_ms.wrapping_sub(last) < self.hold_timeout_ms {
                        return GateOutcome::Held;
                    }
                }

                let on = !relays.get(relay);
                relays.set(relay, on);
                self.last_toggle_ms[relay] = Some(now_ms);
                GateOutcome::Toggled { relay, on }
            }
        }
    }
}

impl Default for PairingGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a frame sequence into its address and data fields.
///
/// Returns `None` unless the sequence is exactly one `s` start symbol
/// followed by 24 bit characters.
fn split_frame(sequence: &str) -> Option<(&[u8; ADDRESS_BITS], u8)> {
    let bytes = sequence.as_bytes();
    if bytes.len() != EV1527_SEQ_LEN || bytes[0] != b's' {
        return None;
    }
    if !bytes[1..].iter().all(|&b| b == b'0' || b == b'1') {
        return None;
    }

    let address: &[u8; ADDRESS_BITS] = bytes[1..1 + ADDRESS_BITS].try_into().ok()?;

    let mut data = 0u8;
    for &bit in &bytes[1 + ADDRESS_BITS..] {
        data = (data << 1) | (bit - b'0');
    }
    Some((address, data))
}
