//! Command wire format and parser.
//!
//! A control write carries ASCII decimal integers separated by any non-digit
//! bytes. The first integer selects the command (`0` off, `1` on, `2` blink);
//! a blink may carry a pulse count and an interval in milliseconds. Separator
//! bytes are skipped rather than rejected, so `"2 5 200"`, `"2,5,200"` and
//! `"blink:2/5/200\n"` all decode to the same command.
//!
//! A blink with a missing count or interval falls back to
//! [`BLINK_COUNT_DEFAULT`] / [`BLINK_INTERVAL_DEFAULT_MS`]. This lenient
//! fill-in is part of the wire contract and must not be tightened silently.

use core::fmt;
use core::time::Duration;

use winnow::ascii::digit1;
use winnow::combinator::{opt, preceded};
use winnow::prelude::*;
use winnow::token::take_till;

/// Fewest pulses a blink may request.
pub const BLINK_COUNT_MIN: u32 = 1;
/// Most pulses a blink may request.
pub const BLINK_COUNT_MAX: u32 = 100;
/// Pulse count used when a blink omits it.
pub const BLINK_COUNT_DEFAULT: u32 = 5;
/// Shortest half-period accepted for a blink.
pub const BLINK_INTERVAL_MIN_MS: u32 = 100;
/// Longest half-period accepted for a blink.
pub const BLINK_INTERVAL_MAX_MS: u32 = 2_500;
/// Half-period used when a blink omits it.
pub const BLINK_INTERVAL_DEFAULT_MS: u32 = 500;

const CODE_TURN_OFF: u32 = 0;
const CODE_TURN_ON: u32 = 1;
const CODE_BLINK: u32 = 2;

/// Validated blink parameters.
///
/// Values can only be built through [`BlinkParams::new`], which enforces the
/// documented bounds, so a stored blink is always in range.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct BlinkParams {
    count: u32,
    interval_ms: u32,
}

impl BlinkParams {
    /// Validates and builds blink parameters.
    pub const fn new(count: u32, interval_ms: u32) -> Result<Self, ParseError> {
        if count < BLINK_COUNT_MIN || count > BLINK_COUNT_MAX {
            return Err(ParseError::OutOfRange(ParseField::Count));
        }
        if interval_ms < BLINK_INTERVAL_MIN_MS || interval_ms > BLINK_INTERVAL_MAX_MS {
            return Err(ParseError::OutOfRange(ParseField::Interval));
        }
        Ok(Self { count, interval_ms })
    }

    /// Number of on/off pulses.
    pub const fn count(self) -> u32 {
        self.count
    }

    /// Half-period of a pulse in milliseconds.
    pub const fn interval_ms(self) -> u32 {
        self.interval_ms
    }

    /// Half-period of a pulse.
    pub const fn interval(self) -> Duration {
        Duration::from_millis(self.interval_ms as u64)
    }
}

impl Default for BlinkParams {
    fn default() -> Self {
        Self {
            count: BLINK_COUNT_DEFAULT,
            interval_ms: BLINK_INTERVAL_DEFAULT_MS,
        }
    }
}

/// Validated instruction targeting one channel.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Command {
    TurnOff,
    TurnOn,
    Blink(BlinkParams),
}

impl Command {
    /// Convenience constructor for a validated blink.
    pub const fn blink(count: u32, interval_ms: u32) -> Result<Self, ParseError> {
        match BlinkParams::new(count, interval_ms) {
            Ok(params) => Ok(Command::Blink(params)),
            Err(err) => Err(err),
        }
    }

    /// Returns `true` for `TurnOff`/`TurnOn`, the commands that preempt a blink.
    pub const fn is_switch(self) -> bool {
        matches!(self, Command::TurnOff | Command::TurnOn)
    }

    /// Returns `true` for a blink.
    pub const fn is_blink(self) -> bool {
        matches!(self, Command::Blink(_))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::TurnOff => f.write_str("off"),
            Command::TurnOn => f.write_str("on"),
            Command::Blink(params) => write!(
                f,
                "blink count={} interval={}ms",
                params.count(),
                params.interval_ms()
            ),
        }
    }
}

/// Command discriminant, matching the leading wire code.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CommandKind {
    TurnOff,
    TurnOn,
    Blink,
}

impl CommandKind {
    /// Maps a leading wire code to a command kind.
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            CODE_TURN_OFF => Some(CommandKind::TurnOff),
            CODE_TURN_ON => Some(CommandKind::TurnOn),
            CODE_BLINK => Some(CommandKind::Blink),
            _ => None,
        }
    }
}

/// Blink field that failed range validation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ParseField {
    Count,
    Interval,
}

impl fmt::Display for ParseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseField::Count => write!(f, "count [{BLINK_COUNT_MIN}, {BLINK_COUNT_MAX}]"),
            ParseField::Interval => write!(
                f,
                "interval [{BLINK_INTERVAL_MIN_MS}, {BLINK_INTERVAL_MAX_MS}] ms"
            ),
        }
    }
}

/// Errors produced while decoding a control write.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// The buffer holds no decimal integer at all.
    Empty,
    /// The leading integer is not a known command code.
    UnknownCommand(u32),
    /// The leading integer does not fit in 32 bits.
    CodeOverflow,
    /// A blink parameter lies outside its documented bounds.
    OutOfRange(ParseField),
    /// The buffer exceeds the control interface message limit.
    TooLong { len: usize, max: usize },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => f.write_str("no command code in buffer"),
            ParseError::UnknownCommand(code) => {
                write!(f, "unknown command code {code} (expected 0, 1 or 2)")
            }
            ParseError::CodeOverflow => f.write_str("command code does not fit in 32 bits"),
            ParseError::OutOfRange(field) => write!(f, "{field} out of range"),
            ParseError::TooLong { len, max } => {
                write!(f, "message of {len} bytes exceeds limit of {max}")
            }
        }
    }
}

/// Decodes a control write into a validated [`Command`].
///
/// Parsing is pure; nothing is validated against channel state.
pub fn parse(buffer: &[u8]) -> Result<Command, ParseError> {
    let mut input = buffer;
    let digits = next_literal(&mut input).ok_or(ParseError::Empty)?;
    let code = decimal(digits).ok_or(ParseError::CodeOverflow)?;
    let kind = CommandKind::from_code(code).ok_or(ParseError::UnknownCommand(code))?;

    match kind {
        CommandKind::TurnOff => Ok(Command::TurnOff),
        CommandKind::TurnOn => Ok(Command::TurnOn),
        CommandKind::Blink => {
            let count = blink_field(&mut input, BLINK_COUNT_DEFAULT);
            let interval_ms = blink_field(&mut input, BLINK_INTERVAL_DEFAULT_MS);
            Command::blink(count, interval_ms)
        }
    }
}

// An oversized field saturates so it surfaces as out of range.
fn blink_field(input: &mut &[u8], default: u32) -> u32 {
    next_literal(input).map_or(default, |digits| decimal(digits).unwrap_or(u32::MAX))
}

fn next_literal<'a>(input: &mut &'a [u8]) -> Option<&'a [u8]> {
    // `opt` backtracks on a missing literal, so the only failure left is a
    // fatal one, which the grammar cannot produce.
    opt(literal).parse_next(input).ok().flatten()
}

fn literal<'a>(input: &mut &'a [u8]) -> ModalResult<&'a [u8]> {
    preceded(take_till(0.., |byte: u8| byte.is_ascii_digit()), digit1).parse_next(input)
}

/// Value of an ASCII digit run, `None` when it overflows `u32`.
fn decimal(digits: &[u8]) -> Option<u32> {
    digits.iter().try_fold(0u32, |acc, digit| {
        acc.checked_mul(10)?.checked_add(u32::from(digit - b'0'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_skip_leading_separators() {
        let mut input: &[u8] = b"  x42,7";
        assert_eq!(next_literal(&mut input), Some(&b"42"[..]));
        assert_eq!(next_literal(&mut input), Some(&b"7"[..]));
        assert_eq!(next_literal(&mut input), None);
    }

    #[test]
    fn decimal_reports_overflow() {
        assert_eq!(decimal(b"4294967295"), Some(u32::MAX));
        assert_eq!(decimal(b"4294967296"), None);
        assert_eq!(decimal(b"007"), Some(7));
    }

    #[test]
    fn oversized_blink_field_saturates() {
        let mut input: &[u8] = b" 99999999999999";
        assert_eq!(blink_field(&mut input, BLINK_COUNT_DEFAULT), u32::MAX);
        assert_eq!(blink_field(&mut input, BLINK_COUNT_DEFAULT), BLINK_COUNT_DEFAULT);
    }

    #[test]
    fn kind_codes_map_to_kinds() {
        assert_eq!(CommandKind::from_code(0), Some(CommandKind::TurnOff));
        assert_eq!(CommandKind::from_code(1), Some(CommandKind::TurnOn));
        assert_eq!(CommandKind::from_code(2), Some(CommandKind::Blink));
        assert_eq!(CommandKind::from_code(3), None);
    }

    #[test]
    fn interval_matches_milliseconds() {
        let params = BlinkParams::new(5, 200).unwrap();
        assert_eq!(params.interval(), Duration::from_millis(200));
    }
}
