//! Decoder behavior tests over synthetic duration streams

use rf_relay_switch::protocols;
use rf_relay_switch::{DecodedEvent, DuplicateFilter, SignalDecoder};

const FRAME: &str = "s000000000011111111110100";

/// Render an EV1527 sequence to durations at the given base time.
fn burst(base: u32, seq: &str) -> Vec<u32> {
    seq.chars()
        .flat_map(|c| {
            let ratios: &[u32] = match c {
                's' => &[1, 31],
                '0' => &[1, 3],
                '1' => &[3, 1],
                _ => panic!("bad code char {:?}", c),
            };
            ratios.iter().map(move |&r| base * r)
        })
        .collect()
}

fn decode_all(decoder: &mut SignalDecoder, durations: &[u32]) -> Vec<String> {
    let mut decoded = vec![];
    let mut sink = |e: &DecodedEvent| decoded.push(e.as_str().to_string());
    for &d in durations {
        decoder.feed(d, &mut sink);
    }
    decoded
}

#[test]
fn test_ev1527_nominal_timing() {
    let mut decoder = SignalDecoder::new();
    decoder.load(protocols::ev1527());

    let decoded = decode_all(&mut decoder, &burst(320, FRAME));
    assert_eq!(decoded, vec![format!("ev1527 {}", FRAME)]);
}

#[test]
fn test_ev1527_within_tolerance() {
    let mut decoder = SignalDecoder::new();
    decoder.load(protocols::ev1527());

    // 15% slow transmitter: still inside the 25% window, and the start
    // pulse recalibrates the windows for the data bits
    let decoded = decode_all(&mut decoder, &burst(368, FRAME));
    assert_eq!(decoded, vec![format!("ev1527 {}", FRAME)]);
}

#[test]
fn test_ev1527_out_of_tolerance_rejected() {
    let mut decoder = SignalDecoder::new();
    decoder.load(protocols::ev1527());

    // 60% off nominal: the start pulse never opens a session
    let decoded = decode_all(&mut decoder, &burst(512, FRAME));
    assert!(decoded.is_empty());
}

#[test]
fn test_noise_resynchronization() {
    let mut decoder = SignalDecoder::new();
    decoder.load(protocols::ev1527());

    let clean = burst(320, FRAME);

    // A valid prefix corrupted by one out-of-window duration
    let mut noisy = clean[..30].to_vec();
    noisy.push(5_000);
    assert!(decode_all(&mut decoder, &noisy).is_empty());

    // The decoder has resynchronized: the next clean frame decodes
    let decoded = decode_all(&mut decoder, &clean);
    assert_eq!(decoded, vec![format!("ev1527 {}", FRAME)]);
}

#[test]
fn test_leading_noise_before_frame() {
    let mut decoder = SignalDecoder::new();
    decoder.load(protocols::ev1527());

    let mut durations = vec![123, 4_567, 89, 1_000_000];
    durations.extend(burst(320, FRAME));

    let decoded = decode_all(&mut decoder, &durations);
    assert_eq!(decoded, vec![format!("ev1527 {}", FRAME)]);
}

#[test]
fn test_full_protocol_table_single_event() {
    let mut decoder = SignalDecoder::new();
    decoder.load(protocols::ev1527());
    decoder.load(protocols::sc5());
    decoder.load(protocols::it1());
    decoder.load(protocols::it2());

    let decoded = decode_all(&mut decoder, &burst(320, FRAME));

    let ev1527: Vec<_> = decoded
        .iter()
        .filter(|s| s.starts_with("ev1527 "))
        .collect();
    assert_eq!(ev1527.len(), 1);
    assert_eq!(ev1527[0], &format!("ev1527 {}", FRAME));
}

#[test]
fn test_duplicate_filter_window() {
    let mut filter = DuplicateFilter::new(200);
    let event = DecodedEvent::new("ev1527", FRAME);

    // A remote retransmits the frame several times per press
    assert!(filter.accept(&event, 0));
    assert!(!filter.accept(&event, 60));
    assert!(!filter.accept(&event, 120));

    // The next press arrives after the window
    assert!(filter.accept(&event, 400));
}
