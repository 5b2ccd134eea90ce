//! rf-relay-switch - Firmware entry point
//!
//! Wires the RF decode pipeline into the device: NVS-backed pairing store,
//! relay GPIO bank, edge-capture ISR, and the cooperative loop driving
//! decode → pairing → relay actuation plus housekeeping (pairing gesture,
//! learning timeout, relay snapshot persistence, log drain).

#![cfg_attr(target_os = "espidf", no_std)]
#![cfg_attr(target_os = "espidf", no_main)]

#[cfg(target_os = "espidf")]
mod firmware {
    use esp_idf_svc::sys as esp_idf_sys;

    use rf_relay_switch::config::{
        NUM_RELAYS, PAIRING_PIN_INPUT, PAIRING_PIN_OUTPUT, RF_DEBOUNCE_MS, RF_RECV_PIN,
    };
    use rf_relay_switch::hal::{PairingButton, RfReceiver};
    use rf_relay_switch::relay::{restore_states, snapshot_states, RelayBank};
    use rf_relay_switch::store::{NvsStore, PairingStore};
    use rf_relay_switch::{
        protocols, rf_error, rf_info, rf_warn, DecodedEvent, DuplicateFilter, GateOutcome,
        LogStream, PairingGate, RfStats, SignalDecoder, TimingRing,
    };

    // Static allocations shared with the ISR
    static TIMING_RING: TimingRing = TimingRing::new();
    static STATS: RfStats = RfStats::new();
    static LOG_STREAM: LogStream = LogStream::new();

    fn timestamp_us() -> i64 {
        unsafe { esp_idf_sys::esp_timer_get_time() }
    }

    fn now_ms() -> u32 {
        (timestamp_us() / 1000) as u32
    }

    fn drain_logs() {
        while let Some(entry) = LOG_STREAM.drain() {
            let level = entry.level.as_str();
            let msg = entry.message();
            unsafe {
                esp_idf_sys::printf(
                    b"[%lld us] %.*s: %.*s\n\0".as_ptr().cast(),
                    entry.timestamp_us,
                    level.len() as i32,
                    level.as_ptr(),
                    msg.len() as i32,
                    msg.as_ptr(),
                );
            }
        }
    }

    /// Park the firmware when a hard init step fails.
    fn halt(message: &str) -> ! {
        rf_error!(LOG_STREAM, timestamp_us(), "init failed: {}", message);
        loop {
            drain_logs();
            unsafe {
                esp_idf_sys::vTaskDelay(100);
            }
        }
    }

    #[no_mangle]
    fn main() {
        esp_idf_sys::link_patches();

        rf_info!(LOG_STREAM, timestamp_us(), "starting relay controller");

        let Ok(mut store) = NvsStore::open() else {
            halt("nvs store");
        };

        // Relay bank, restoring the persisted states
        let Ok(mut relays) = RelayBank::from_config() else {
            halt("relay gpio");
        };
        let mut states = [0u8; NUM_RELAYS];
        if store.relay_states(&mut states) {
            restore_states(&mut relays, &states);
            rf_info!(LOG_STREAM, timestamp_us(), "restored relay states");
        }

        // Pairing gate, restoring the learned remote
        let mut gate = PairingGate::new();
        gate.load(&mut store);
        if gate.is_paired() {
            rf_info!(LOG_STREAM, timestamp_us(), "paired remote on file");
        } else {
            rf_info!(LOG_STREAM, timestamp_us(), "no paired remote");
        }

        // Decoder with every supported protocol loaded
        let mut decoder = SignalDecoder::new();
        decoder.load(protocols::ev1527());
        decoder.load(protocols::sc5());
        decoder.load(protocols::it1());
        decoder.load(protocols::it2());

        let mut filter = DuplicateFilter::new(RF_DEBOUNCE_MS);

        if RfReceiver::install(RF_RECV_PIN, &TIMING_RING, &STATS).is_err() {
            halt("rf receiver");
        }
        rf_info!(
            LOG_STREAM,
            timestamp_us(),
            "rf receiver on gpio {}",
            RF_RECV_PIN
        );

        let Ok(button) = PairingButton::new(PAIRING_PIN_INPUT, PAIRING_PIN_OUTPUT) else {
            halt("pairing button");
        };

        loop {
            // Drain captured durations through the decode pipeline
            while let Some(duration) = TIMING_RING.dequeue() {
                let now = now_ms();
                decoder.feed(duration, &mut |event: &DecodedEvent| {
                    STATS.count_decoded();

                    if !filter.accept(event, now) {
                        STATS.count_duplicate();
                        return;
                    }
                    rf_info!(LOG_STREAM, timestamp_us(), "received: {}", event.as_str());

                    match gate.on_decoded(event, now, &mut store, &mut relays) {
                        GateOutcome::Ignored => {}
                        GateOutcome::Learned => {
                            rf_info!(LOG_STREAM, timestamp_us(), "paired remote learned");
                        }
                        GateOutcome::StoreFailed => {
                            rf_warn!(LOG_STREAM, timestamp_us(), "pairing store write failed");
                        }
                        GateOutcome::AddressMismatch => {
                            STATS.count_address_mismatch();
                        }
                        GateOutcome::UnmappedPayload => {
                            STATS.count_unmapped();
                        }
                        GateOutcome::Held => {
                            STATS.count_held();
                        }
                        GateOutcome::Toggled { relay, on } => {
                            rf_info!(
                                LOG_STREAM,
                                timestamp_us(),
                                "relay {} toggled {}",
                                relay,
                                if on { "on" } else { "off" }
                            );
                        }
                    }
                });

                // Yield between samples so decode cannot starve other work
                unsafe {
                    esp_idf_sys::vTaskDelay(0);
                }
            }

            // Pairing gesture and learning-window expiry
            if button.pressed() && !gate.is_learning() {
                gate.start_learning(now_ms());
                rf_info!(LOG_STREAM, timestamp_us(), "pairing mode (30s window)");
            }
            if gate.poll(now_ms()) {
                rf_info!(LOG_STREAM, timestamp_us(), "pairing mode timeout");
            }

            // Persist relay snapshot when it changed
            if relays.take_dirty() {
                if store.set_relay_states(&snapshot_states(&relays)).is_err() {
                    rf_warn!(LOG_STREAM, timestamp_us(), "relay snapshot write failed");
                }
            }

            drain_logs();

            unsafe {
                esp_idf_sys::vTaskDelay(1);
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("rf-relay-switch targets ESP-IDF; build with the espidf toolchain");
}
