//! Relay actuation collaborator.
//!
//! The pairing gate drives relays through the [`RelayControl`] trait and
//! treats calls as infallible. On the device [`RelayBank`] wraps the relay
//! GPIO pins; hosts use [`SoftRelays`].

use crate::config::NUM_RELAYS;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{self as esp_idf_sys, esp, gpio_config, gpio_config_t, gpio_set_level, EspError};

/// Set and read back relay outputs by index.
pub trait RelayControl {
    fn set(&mut self, index: usize, on: bool);
    fn get(&self, index: usize) -> bool;
}

/// In-memory relay bank for host builds and tests.
#[derive(Default)]
pub struct SoftRelays {
    states: [bool; NUM_RELAYS],
}

impl SoftRelays {
    pub const fn new() -> Self {
        Self {
            states: [false; NUM_RELAYS],
        }
    }
}

impl RelayControl for SoftRelays {
    fn set(&mut self, index: usize, on: bool) {
        if index < NUM_RELAYS {
            self.states[index] = on;
        }
    }

    fn get(&self, index: usize) -> bool {
        index < NUM_RELAYS && self.states[index]
    }
}

/// Pack the current relay states into a persistable snapshot, one byte per
/// relay.
pub fn snapshot_states<R: RelayControl>(relays: &R) -> [u8; NUM_RELAYS] {
    let mut states = [0u8; NUM_RELAYS];
    for (i, state) in states.iter_mut().enumerate() {
        *state = relays.get(i) as u8;
    }
    states
}

/// Apply a persisted snapshot to the relay outputs.
pub fn restore_states<R: RelayControl>(relays: &mut R, states: &[u8]) {
    for (i, &state) in states.iter().take(NUM_RELAYS).enumerate() {
        relays.set(i, state != 0);
    }
}

/// GPIO relay bank used on the device.
///
/// Keeps a shadow of the commanded states so `get` does not read back the
/// output latch, and flags unsaved changes for the periodic persist step.
#[cfg(target_os = "espidf")]
pub struct RelayBank {
    pins: [i32; NUM_RELAYS],
    states: [bool; NUM_RELAYS],
    dirty: bool,
}

#[cfg(target_os = "espidf")]
impl RelayBank {
    /// Configure the relay pins from [`crate::config::RELAY_PINS`], all
    /// driven off.
    pub fn from_config() -> Result<Self, EspError> {
        let pins = crate::config::RELAY_PINS;

        let mut mask = 0u64;
        for pin in pins {
            mask |= 1u64 << pin;
        }
        let conf = gpio_config_t {
            pin_bit_mask: mask,
            mode: esp_idf_sys::gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: esp_idf_sys::gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: esp_idf_sys::gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: esp_idf_sys::gpio_int_type_t_GPIO_INTR_DISABLE,
            ..Default::default()
        };

        unsafe {
            esp!(gpio_config(&conf))?;
            for pin in pins {
                gpio_set_level(pin, 0);
            }
        }

        Ok(Self {
            pins,
            states: [false; NUM_RELAYS],
            dirty: false,
        })
    }

    /// True once when a state changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        core::mem::replace(&mut self.dirty, false)
    }
}

#[cfg(target_os = "espidf")]
impl RelayControl for RelayBank {
    fn set(&mut self, index: usize, on: bool) {
        if index >= NUM_RELAYS {
            return;
        }
        unsafe {
            gpio_set_level(self.pins[index], on as u32);
        }
        self.dirty = self.dirty || self.states[index] != on;
        self.states[index] = on;
    }

    fn get(&self, index: usize) -> bool {
        index < NUM_RELAYS && self.states[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_relays_set_get() {
        let mut relays = SoftRelays::new();
        assert!(!relays.get(0));

        relays.set(0, true);
        relays.set(2, true);
        assert!(relays.get(0));
        assert!(!relays.get(1));
        assert!(relays.get(2));

        // Out-of-range indices are inert
        relays.set(99, true);
        assert!(!relays.get(99));
    }

    #[test]
    fn test_snapshot_and_restore() {
        let mut relays = SoftRelays::new();
        relays.set(1, true);
        relays.set(3, true);

        let snapshot = snapshot_states(&relays);
        assert_eq!(snapshot, [0, 1, 0, 1]);

        let mut other = SoftRelays::new();
        restore_states(&mut other, &snapshot);
        assert!(!other.get(0));
        assert!(other.get(1));
        assert!(!other.get(2));
        assert!(other.get(3));
    }
}
