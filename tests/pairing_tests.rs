//! Pairing lifecycle and command handling, driven end-to-end through the
//! decoder where it matters.

use rf_relay_switch::composer::{compose, MAX_BURST_LEN};
use rf_relay_switch::pairing::relay_for_payload;
use rf_relay_switch::protocols;
use rf_relay_switch::relay::{RelayControl, SoftRelays};
use rf_relay_switch::store::{MemStore, PairingStore};
use rf_relay_switch::{DecodedEvent, GateOutcome, PairingGate, SignalDecoder};

const ADDRESS: &str = "01001100101011110000";
const OTHER_ADDRESS: &str = "11111111110000000000";

fn frame(address: &str, data: &str) -> DecodedEvent {
    DecodedEvent::new("ev1527", &format!("s{}{}", address, data))
}

/// Decode a composed EV1527 burst and route the events into the gate.
fn transmit(
    decoder: &mut SignalDecoder,
    gate: &mut PairingGate,
    store: &mut MemStore,
    relays: &mut SoftRelays,
    address: &str,
    data: &str,
    now_ms: u32,
) -> Vec<GateOutcome> {
    let signal = format!("ev1527 s{}{}", address, data);
    let mut timings = [0u32; MAX_BURST_LEN];
    let n = compose(decoder, &signal, &mut timings);
    assert!(n > 0);

    let mut outcomes = vec![];
    for i in 0..n {
        let t = timings[i];
        decoder.feed(t, &mut |event: &DecodedEvent| {
            outcomes.push(gate.on_decoded(event, now_ms, store, relays));
        });
    }
    outcomes
}

#[test]
fn test_lifecycle_learn_then_reject_other_remote() {
    let mut decoder = SignalDecoder::new();
    decoder.load(protocols::ev1527());
    let mut gate = PairingGate::new();
    let mut store = MemStore::new();
    let mut relays = SoftRelays::new();

    gate.start_learning(0);
    let outcomes = transmit(
        &mut decoder,
        &mut gate,
        &mut store,
        &mut relays,
        ADDRESS,
        "1000",
        100,
    );
    assert_eq!(outcomes, vec![GateOutcome::Learned]);
    assert!(gate.is_paired());
    assert_eq!(gate.address(), Some(ADDRESS));

    // A second remote with a different address is ignored and does not
    // overwrite the stored pairing
    let outcomes = transmit(
        &mut decoder,
        &mut gate,
        &mut store,
        &mut relays,
        OTHER_ADDRESS,
        "1000",
        1_000,
    );
    assert_eq!(outcomes, vec![GateOutcome::AddressMismatch]);
    assert_eq!(gate.address(), Some(ADDRESS));

    let stored = store.address().unwrap();
    assert_eq!(&stored, ADDRESS.as_bytes());
}

#[test]
fn test_hold_detection_one_toggle_per_window() {
    let mut gate = PairingGate::new();
    let mut store = MemStore::new();
    let mut relays = SoftRelays::new();

    gate.start_learning(0);
    gate.on_decoded(&frame(ADDRESS, "0010"), 0, &mut store, &mut relays);
    assert!(gate.is_paired());

    // Two decodes of the same button inside the 500ms hold window: one toggle
    let o1 = gate.on_decoded(&frame(ADDRESS, "0010"), 1_000, &mut store, &mut relays);
    let o2 = gate.on_decoded(&frame(ADDRESS, "0010"), 1_400, &mut store, &mut relays);
    assert_eq!(o1, GateOutcome::Toggled { relay: 2, on: true });
    assert_eq!(o2, GateOutcome::Held);
    assert!(relays.get(2));

    // A third decode after the window elapses toggles again
    let o3 = gate.on_decoded(&frame(ADDRESS, "0010"), 1_600, &mut store, &mut relays);
    assert_eq!(o3, GateOutcome::Toggled { relay: 2, on: false });
    assert!(!relays.get(2));
}

#[test]
fn test_all_buttons_map_to_their_relays() {
    let mut gate = PairingGate::new();
    let mut store = MemStore::new();
    let mut relays = SoftRelays::new();

    gate.start_learning(0);
    gate.on_decoded(&frame(ADDRESS, "1000"), 0, &mut store, &mut relays);

    let buttons = [("1000", 0), ("0100", 1), ("0010", 2), ("0001", 3)];
    for (i, (data, relay)) in buttons.iter().enumerate() {
        let now = 10_000 + i as u32 * 1_000;
        let outcome = gate.on_decoded(&frame(ADDRESS, data), now, &mut store, &mut relays);
        assert_eq!(
            outcome,
            GateOutcome::Toggled {
                relay: *relay,
                on: true
            }
        );
        assert!(relays.get(*relay));
    }
}

#[test]
fn test_multi_bit_payloads_unmapped() {
    for data in [0x0u8, 0x3, 0x5, 0x6, 0x7, 0x9, 0xA, 0xF] {
        assert_eq!(relay_for_payload(data), None);
    }
}

#[test]
fn test_learning_timeout_then_idle_ignores_frames() {
    let mut gate = PairingGate::new();
    let mut store = MemStore::new();
    let mut relays = SoftRelays::new();

    gate.start_learning(5_000);
    assert!(gate.is_learning());

    // Polled past the 30s window
    assert!(gate.poll(36_000));
    assert!(!gate.is_learning());

    let outcome = gate.on_decoded(&frame(ADDRESS, "1000"), 36_100, &mut store, &mut relays);
    assert_eq!(outcome, GateOutcome::Ignored);
    assert!(store.address().is_none());
}

#[test]
fn test_persistence_survives_reboot() {
    let mut store = MemStore::new();

    {
        let mut gate = PairingGate::new();
        let mut relays = SoftRelays::new();
        gate.start_learning(0);
        gate.on_decoded(&frame(ADDRESS, "1000"), 0, &mut store, &mut relays);
        assert!(gate.is_paired());
    }

    // A fresh gate over the same store picks the pairing back up
    let mut gate = PairingGate::new();
    gate.load(&mut store);
    assert!(gate.is_paired());
    assert_eq!(gate.address(), Some(ADDRESS));
}

#[test]
fn test_relay_state_snapshot_roundtrip() {
    use rf_relay_switch::relay::{restore_states, snapshot_states};

    let mut store = MemStore::new();
    let mut relays = SoftRelays::new();
    relays.set(0, true);
    relays.set(3, true);

    store.set_relay_states(&snapshot_states(&relays)).unwrap();

    let mut out = [0u8; 4];
    assert!(store.relay_states(&mut out));

    let mut restored = SoftRelays::new();
    restore_states(&mut restored, &out);
    assert!(restored.get(0));
    assert!(!restored.get(1));
    assert!(!restored.get(2));
    assert!(restored.get(3));
}
