//! 433MHz receiver and transmitter wiring.
//!
//! The receiver registers an any-edge GPIO ISR that timestamps every
//! transition of the RF data line and enqueues the elapsed duration into
//! the handoff ring. The ISR body is a handful of instructions: one timer
//! read, one subtraction, one lock-free enqueue, one counter bump.

use core::cell::UnsafeCell;
use core::ptr;

use esp_idf_svc::sys::{
    self as esp_idf_sys, esp, gpio_config, gpio_config_t, gpio_get_level, gpio_install_isr_service,
    gpio_intr_disable, gpio_intr_enable, gpio_isr_handler_add, gpio_set_level, EspError,
};

use crate::capture::{EdgeSampler, TimingRing};
use crate::composer::{compose, MAX_BURST_LEN};
use crate::decoder::{DecodedEvent, SignalDecoder};
use crate::stats::RfStats;

// Wrapper making the ISR state Sync for a static.
// SAFETY: Written once during install (before the handler is registered),
// afterwards touched only from the single edge ISR.
#[repr(transparent)]
struct IsrCell<T>(UnsafeCell<T>);
unsafe impl<T> Sync for IsrCell<T> {}

struct IsrState {
    ring: Option<&'static TimingRing>,
    stats: Option<&'static RfStats>,
    sampler: EdgeSampler,
}

static ISR_STATE: IsrCell<IsrState> = IsrCell(UnsafeCell::new(IsrState {
    ring: None,
    stats: None,
    sampler: EdgeSampler::new(),
}));

unsafe extern "C" fn edge_isr(_arg: *mut core::ffi::c_void) {
    let now = esp_idf_sys::esp_timer_get_time();

    // SAFETY: Exclusive access; this is the only edge ISR and install()
    // finished writing the state before registering it.
    let state = &mut *ISR_STATE.0.get();
    let duration = state.sampler.on_edge(now);

    if let (Some(ring), Some(stats)) = (state.ring, state.stats) {
        if ring.enqueue(duration) {
            stats.count_captured();
        } else {
            stats.count_dropped();
        }
    }
}

/// Receive side: any-edge ISR feeding the handoff ring.
pub struct RfReceiver {
    pin: i32,
}

impl RfReceiver {
    /// Configure the receive pin and register the edge ISR.
    ///
    /// Call once; the ISR state is global to the single receiver.
    pub fn install(
        pin: i32,
        ring: &'static TimingRing,
        stats: &'static RfStats,
    ) -> Result<Self, EspError> {
        // SAFETY: The handler is not registered yet; nothing else touches
        // the state.
        unsafe {
            let state = &mut *ISR_STATE.0.get();
            state.ring = Some(ring);
            state.stats = Some(stats);
        }

        let conf = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: esp_idf_sys::gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: esp_idf_sys::gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: esp_idf_sys::gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: esp_idf_sys::gpio_int_type_t_GPIO_INTR_ANYEDGE,
            ..Default::default()
        };

        unsafe {
            esp!(gpio_config(&conf))?;

            // Already-installed service is fine; any other error is not
            let err = gpio_install_isr_service(0);
            if err != esp_idf_sys::ESP_OK as i32 && err != esp_idf_sys::ESP_ERR_INVALID_STATE as i32 {
                esp!(err)?;
            }

            esp!(gpio_isr_handler_add(pin, Some(edge_isr), ptr::null_mut()))?;
        }

        Ok(Self { pin })
    }

    /// Mask the edge interrupt (used while transmitting).
    pub fn pause(&mut self) {
        unsafe {
            gpio_intr_disable(self.pin);
        }
    }

    /// Re-enable the edge interrupt.
    pub fn resume(&mut self) {
        unsafe {
            gpio_intr_enable(self.pin);
        }
    }
}

/// Transmit side: replays composed timing bursts on the TX pin.
pub struct RfTransmitter {
    pin: i32,
}

impl RfTransmitter {
    /// Configure the transmit pin, driven to its idle (low) level.
    pub fn new(pin: i32) -> Result<Self, EspError> {
        let conf = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: esp_idf_sys::gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: esp_idf_sys::gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: esp_idf_sys::gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: esp_idf_sys::gpio_int_type_t_GPIO_INTR_DISABLE,
            ..Default::default()
        };

        unsafe {
            esp!(gpio_config(&conf))?;
            gpio_set_level(pin, 0);
        }

        Ok(Self { pin })
    }

    /// Transmit a symbolic signal, repeating the burst the protocol's
    /// configured number of times.
    ///
    /// The receiver, when present, is paused for the whole transmission so
    /// the decoder does not chase the device's own output. The pin is
    /// always returned to its idle level.
    pub fn send(
        &mut self,
        decoder: &SignalDecoder,
        signal: &str,
        mut receiver: Option<&mut RfReceiver>,
    ) {
        let Some(event) = DecodedEvent::parse(signal) else {
            return;
        };
        let repeat = decoder.send_repeat(event.protocol());

        let mut timings = [0u32; MAX_BURST_LEN];
        let n = compose(decoder, signal, &mut timings);
        if repeat == 0 || n == 0 {
            return;
        }

        if let Some(rx) = receiver.as_mut() {
            rx.pause();
        }

        for _ in 0..repeat {
            let mut level = false;
            for &t in &timings[..n] {
                level = !level;
                unsafe {
                    gpio_set_level(self.pin, level as u32);
                    esp_idf_sys::esp_rom_delay_us(t);
                }
            }
        }

        // Never leave the output active
        unsafe {
            gpio_set_level(self.pin, 0);
        }

        if let Some(rx) = receiver.as_mut() {
            rx.resume();
        }
    }
}

/// Pairing gesture input: two pads, the output pad driven low so bridging
/// them pulls the input pad down.
pub struct PairingButton {
    input: i32,
}

impl PairingButton {
    pub fn new(input: i32, output: i32) -> Result<Self, EspError> {
        let in_conf = gpio_config_t {
            pin_bit_mask: 1u64 << input,
            mode: esp_idf_sys::gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: esp_idf_sys::gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: esp_idf_sys::gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: esp_idf_sys::gpio_int_type_t_GPIO_INTR_DISABLE,
            ..Default::default()
        };
        let out_conf = gpio_config_t {
            pin_bit_mask: 1u64 << output,
            mode: esp_idf_sys::gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: esp_idf_sys::gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: esp_idf_sys::gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: esp_idf_sys::gpio_int_type_t_GPIO_INTR_DISABLE,
            ..Default::default()
        };

        unsafe {
            esp!(gpio_config(&in_conf))?;
            esp!(gpio_config(&out_conf))?;
            gpio_set_level(output, 0);
        }

        Ok(Self { input })
    }

    /// True while the pads are bridged.
    pub fn pressed(&self) -> bool {
        unsafe { gpio_get_level(self.input) == 0 }
    }
}
