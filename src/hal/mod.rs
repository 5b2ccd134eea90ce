//! Hardware Abstraction Layer.
//!
//! Thin wrappers around ESP-IDF peripherals. Decode and pairing logic
//! stays in the core modules, HAL is just I/O.

#[cfg(target_os = "espidf")]
pub mod rf;

#[cfg(target_os = "espidf")]
pub use rf::{PairingButton, RfReceiver, RfTransmitter};
