//! Built-in 433MHz protocol definitions.
//!
//! Ratio tables for the remote-control encodings the switch understands.
//! Timings are multiples of each protocol's base time in microseconds.

use crate::protocol::{Code, CodeRole, Protocol};

/// The "older" intertechno protocol with fixed 12 bits of data.
pub fn it1() -> Protocol {
    Protocol::new(
        "it1",
        1 + 12,
        1 + 12,
        25,
        4,
        400,
        &[
            Code::new(CodeRole::START, 'B', &[1, 31]),
            Code::new(CodeRole::DATA, '0', &[1, 3, 3, 1]),
            Code::new(CodeRole::DATA, '1', &[1, 3, 1, 3]),
        ],
    )
}

/// The "newer" intertechno protocol with 32 - 46 data bits.
pub fn it2() -> Protocol {
    Protocol::new(
        "it2",
        34,
        48,
        25,
        10,
        280,
        &[
            Code::new(CodeRole::START, 's', &[1, 10]),
            Code::new(CodeRole::DATA, '_', &[1, 1, 1, 5]),
            Code::new(CodeRole::DATA, '#', &[1, 5, 1, 1]),
            Code::new(CodeRole::DATA, 'D', &[1, 1, 1, 1]),
            Code::new(CodeRole::END, 'x', &[1, 38]),
        ],
    )
}

/// The protocol from SC5272 and similar chips with 12 data bits.
pub fn sc5() -> Protocol {
    Protocol::new(
        "sc5",
        1 + 12,
        1 + 12,
        25,
        3,
        100,
        &[
            Code::new(CodeRole::ANY_DATA, '0', &[4, 12, 4, 12]),
            Code::new(CodeRole::ANY_DATA, '1', &[12, 4, 12, 4]),
            Code::new(CodeRole::ANY_DATA, 'f', &[4, 12, 12, 4]),
            Code::new(CodeRole::END, 'S', &[4, 124]),
        ],
    )
}

/// The protocol from EV1527 and similar chips with 20 address and 4 data
/// bits. This is the encoding the pairing gate interprets.
pub fn ev1527() -> Protocol {
    Protocol::new(
        "ev1527",
        1 + 20 + 4,
        1 + 20 + 4,
        25,
        3,
        320,
        &[
            Code::new(CodeRole::START, 's', &[1, 31]),
            Code::new(CodeRole::DATA, '0', &[1, 3]),
            Code::new(CodeRole::DATA, '1', &[3, 1]),
        ],
    )
}
