//! Pulse-width protocol model.
//!
//! A protocol is a small alphabet of [`Code`]s, each a run of pulse
//! durations expressed as ratios of a shared base time. The decoder matches
//! incoming durations against the `[min,max]` acceptance windows derived
//! from `base_time * ratio ± tolerance%`, and recalibrates the base time
//! from the measured start code to track an individual transmitter's clock.

use crate::capture::CodeTime;

/// Maximum number of timing slots per code.
pub const MAX_TIME_SLOTS: usize = 8;

/// Maximum number of codes per protocol.
pub const MAX_CODES: usize = 8;

/// Maximum length of a decoded code sequence.
pub const MAX_SEQUENCE_LEN: usize = 120;

/// Maximum protocol name length.
pub const PROTOCOL_NAME_LEN: usize = 11;

/// Where in a sequence a code may appear.
///
/// Roles combine as bit flags: `ANY_DATA` codes may open a sequence and
/// carry data, `ANY` codes may carry data or close the sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodeRole(u8);

impl CodeRole {
    /// Opens a sequence.
    pub const START: CodeRole = CodeRole(0x01);
    /// Carries data inside a sequence.
    pub const DATA: CodeRole = CodeRole(0x02);
    /// Closes a sequence.
    pub const END: CodeRole = CodeRole(0x04);
    /// START | DATA: a data code that may also open a sequence.
    pub const ANY_DATA: CodeRole = CodeRole(0x03);
    /// DATA | END: a data code that may also close the sequence.
    pub const ANY: CodeRole = CodeRole(0x06);

    /// Acceptable as the first code of a sequence.
    #[inline]
    pub const fn starts_sequence(self) -> bool {
        self.0 & Self::START.0 != 0
    }

    /// Acceptable while a sequence is underway.
    #[inline]
    pub const fn continues_sequence(self) -> bool {
        self.0 & Self::ANY.0 != 0
    }

    /// May close a sequence.
    #[inline]
    pub const fn ends_sequence(self) -> bool {
        self.0 & Self::END.0 != 0
    }

    /// Pure END code with no data role.
    #[inline]
    pub const fn is_end_only(self) -> bool {
        self.0 == Self::END.0
    }
}

/// One symbol of a protocol's alphabet: a named run of nominal timing
/// ratios plus the matching state for the decode attempt in progress.
#[derive(Clone, Copy, Debug)]
pub struct Code {
    /// Role of this code within a sequence.
    pub role: CodeRole,
    /// Single-character name used in the decoded message string.
    pub name: char,

    /// Nominal durations as multiples of the protocol base time.
    ratios: [CodeTime; MAX_TIME_SLOTS],
    /// Number of timing slots in this code.
    slots: usize,

    /// Acceptance window lower bounds, derived per slot.
    min_time: [CodeTime; MAX_TIME_SLOTS],
    /// Acceptance window upper bounds, derived per slot.
    max_time: [CodeTime; MAX_TIME_SLOTS],

    /// Slots matched so far in the current attempt.
    cnt: usize,
    /// Measured total duration of the matched slots.
    total: CodeTime,
    /// Still a candidate for the current attempt.
    valid: bool,
}

impl Code {
    /// Define a code from its role, name and nominal ratio list.
    ///
    /// At most [`MAX_TIME_SLOTS`] ratios are kept.
    pub const fn new(role: CodeRole, name: char, ratios: &[CodeTime]) -> Self {
        let mut r = [0; MAX_TIME_SLOTS];
        let mut i = 0;
        while i < ratios.len() && i < MAX_TIME_SLOTS {
            r[i] = ratios[i];
            i += 1;
        }

        Self {
            role,
            name,
            ratios: r,
            slots: i,
            min_time: [0; MAX_TIME_SLOTS],
            max_time: [0; MAX_TIME_SLOTS],
            cnt: 0,
            total: 0,
            valid: true,
        }
    }

    /// Number of timing slots.
    #[inline]
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Acceptance window of a slot as `(min, max)`.
    #[inline]
    pub fn window(&self, slot: usize) -> (CodeTime, CodeTime) {
        (self.min_time[slot], self.max_time[slot])
    }

    /// Sum of the nominal ratios, the divisor for base time recalibration.
    fn ratio_sum(&self) -> CodeTime {
        let mut sum = 0;
        for i in 0..self.slots {
            sum += self.ratios[i];
        }
        sum
    }

    /// Recompute the acceptance windows from a base time and tolerance.
    fn recalc(&mut self, base_time: CodeTime, tolerance: u32) {
        for i in 0..self.slots {
            let t = base_time * self.ratios[i];
            let radius = (t * tolerance) / 100;
            self.min_time[i] = t - radius;
            self.max_time[i] = t + radius;
        }
    }

    /// Clear the matching progress for a fresh attempt.
    fn reset(&mut self) {
        self.valid = true;
        self.cnt = 0;
        self.total = 0;
    }
}

/// Outcome of feeding one duration to a protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Nothing to report; the session advanced, reset or stayed put.
    Pending,
    /// A full sequence was recognized and is readable via
    /// [`Protocol::sequence`] until the caller resets the session.
    Complete,
}

/// A loaded protocol definition plus its single decode session.
///
/// The session is either empty (no partial sequence) or holds the partial
/// sequence accumulated so far together with every code's match progress.
/// All codes reset together whenever the session resets.
pub struct Protocol {
    name: &'static str,
    /// Minimum number of codes in a complete sequence.
    pub min_len: usize,
    /// Number of codes that completes a sequence unconditionally.
    pub max_len: usize,
    /// Timing tolerance in percent of the nominal duration.
    pub tolerance: u32,
    /// Number of burst repeats when transmitting.
    pub send_repeat: u32,

    /// Nominal base time in microseconds. Windows are recalibrated from the
    /// measured start code during a session and restored to this on reset.
    base_time: CodeTime,

    codes: [Code; MAX_CODES],
    code_count: usize,

    seq: [u8; MAX_SEQUENCE_LEN],
    seq_len: usize,
}

impl Protocol {
    /// Build a protocol from its static definition.
    ///
    /// Acceptance windows are computed immediately from the nominal base
    /// time; the session starts empty.
    pub fn new(
        name: &'static str,
        min_len: usize,
        max_len: usize,
        tolerance: u32,
        send_repeat: u32,
        base_time: CodeTime,
        codes: &[Code],
    ) -> Self {
        debug_assert!(name.len() <= PROTOCOL_NAME_LEN);
        debug_assert!(max_len <= MAX_SEQUENCE_LEN);
        debug_assert!(min_len <= max_len);

        let mut table = [Code::new(CodeRole::DATA, '\0', &[]); MAX_CODES];
        let count = codes.len().min(MAX_CODES);
        table[..count].copy_from_slice(&codes[..count]);

        let mut protocol = Self {
            name,
            min_len,
            max_len,
            tolerance,
            send_repeat,
            base_time,
            codes: table,
            code_count: count,
            seq: [0; MAX_SEQUENCE_LEN],
            seq_len: 0,
        };
        protocol.reset_session();
        protocol
    }

    /// Protocol name as used in the symbolic format.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Nominal base time in microseconds.
    #[inline]
    pub fn base_time(&self) -> CodeTime {
        self.base_time
    }

    /// The sequence accumulated by the current session.
    pub fn sequence(&self) -> &str {
        // Sequence bytes are code names, which are ASCII by construction.
        core::str::from_utf8(&self.seq[..self.seq_len]).unwrap_or("")
    }

    /// Look up a code by its character name.
    pub fn code(&self, name: char) -> Option<&Code> {
        self.codes[..self.code_count].iter().find(|c| c.name == name)
    }

    /// Loaded codes, in declaration order.
    pub fn codes(&self) -> &[Code] {
        &self.codes[..self.code_count]
    }

    /// Recompute every code's windows from a new base time.
    fn recalc(&mut self, base_time: CodeTime) {
        let tolerance = self.tolerance;
        for code in &mut self.codes[..self.code_count] {
            code.recalc(base_time, tolerance);
        }
    }

    /// Revalidate all codes without touching the sequence.
    fn reset_codes(&mut self) {
        for code in &mut self.codes[..self.code_count] {
            code.reset();
        }
    }

    /// Drop any partial sequence and restore the nominal timing windows.
    pub fn reset_session(&mut self) {
        self.seq_len = 0;
        self.reset_codes();
        self.recalc(self.base_time);
    }

    /// Classify one duration against this protocol's code table.
    ///
    /// Codes are tried in declaration order. A code is a candidate only
    /// while it is still valid for the current attempt and its role fits
    /// the session position (empty session: START roles; otherwise DATA or
    /// END roles). A failed check on the second slot of a code while the
    /// session is empty re-evaluates this same duration once from a fresh
    /// session, so a truncated start pulse can still open a new sequence.
    ///
    /// On [`ParseOutcome::Complete`] the finished sequence stays readable
    /// until [`Protocol::reset_session`] is called.
    pub fn parse(&mut self, duration: CodeTime) -> ParseOutcome {
        let mut any_valid = false;
        let mut retry = false;
        let mut idx = 0;

        while idx < self.code_count {
            if self.codes[idx].valid {
                let slot = self.codes[idx].cnt;
                let role = self.codes[idx].role;
                let (min, max) = self.codes[idx].window(slot);
                let mut matched = false;

                if self.seq_len == 0 && !role.starts_sequence() {
                    // Only start codes may open a sequence
                } else if self.seq_len > 0 && !role.continues_sequence() {
                    // Only data and end codes may continue one
                } else if duration < min || duration > max {
                    if slot == 1 && self.seq_len == 0 {
                        // The first slot fit but the second does not: retry
                        // this duration as a potential new start pulse
                        retry = true;
                    }
                } else {
                    matched = true;
                    self.codes[idx].total += duration;
                }

                self.codes[idx].valid = matched;
                any_valid = any_valid || matched;

                if retry {
                    self.reset_session();
                } else if matched {
                    self.codes[idx].cnt = slot + 1;

                    if slot + 1 == self.codes[idx].slots {
                        return self.complete_code(idx);
                    }
                }
            }

            if retry {
                // Re-run the same code once against the same duration
                retry = false;
            } else {
                idx += 1;
            }
        }

        if !any_valid {
            // No candidate survived; resynchronize
            self.reset_session();
        }
        ParseOutcome::Pending
    }

    /// A code matched all its slots: append it and check termination.
    fn complete_code(&mut self, idx: usize) -> ParseOutcome {
        if self.seq_len == 0 {
            // First accepted code: recalibrate the base time from the
            // measured start pulse to track this transmitter's clock
            let measured = self.codes[idx].total / self.codes[idx].ratio_sum();
            self.recalc(measured);
        }

        let name = self.codes[idx].name;
        let role = self.codes[idx].role;
        self.seq[self.seq_len] = name as u8;
        self.seq_len += 1;

        self.reset_codes();

        if role.is_end_only() && self.seq_len < self.min_len {
            // End marker before the minimum length: a fragment
            self.reset_session();
            ParseOutcome::Pending
        } else if role.ends_sequence() && self.seq_len >= self.min_len {
            ParseOutcome::Complete
        } else if self.seq_len == self.max_len {
            ParseOutcome::Complete
        } else {
            ParseOutcome::Pending
        }
    }
}
