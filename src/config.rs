//! Compile-time device configuration.
//!
//! Pin assignments and timing windows for the relay switch hardware.
//! Everything the firmware needs to know about the board lives here.

/// GPIO pin of the 433MHz receiver data line.
pub const RF_RECV_PIN: i32 = 5;

/// GPIO pin of the 433MHz transmitter, `None` when the board has no TX stage.
pub const RF_SEND_PIN: Option<i32> = None;

/// Relay output pins, in relay-index order.
pub const RELAY_PINS: [i32; NUM_RELAYS] = [4, 14, 12, 13];

/// Number of relays on this board.
pub const NUM_RELAYS: usize = 4;

/// Capacity of the edge-duration handoff ring. Must be a power of 2.
pub const CAPTURE_CAPACITY: usize = 512;

/// Window in which an identical decoded string is treated as a retransmission
/// of the same physical press and filtered out.
pub const RF_DEBOUNCE_MS: u32 = 200;

/// Minimum interval between two toggles of the same relay. A decode arriving
/// earlier is attributed to a held button.
pub const RF_HOLD_TIMEOUT_MS: u32 = 500;

/// How long the pairing window stays open once triggered.
pub const PAIRING_TIMEOUT_MS: u32 = 30_000;

/// Pairing gesture input pin (pulled low by the paired output pin when the
/// two pads are bridged).
pub const PAIRING_PIN_INPUT: i32 = 0;

/// Pairing gesture output pin, driven low.
pub const PAIRING_PIN_OUTPUT: i32 = 2;
