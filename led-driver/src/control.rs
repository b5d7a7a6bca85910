//! Control-interface adapter.
//!
//! Translates device-style open/write/read/release calls, addressed by minor
//! number, into parser and scheduler calls. Status codes follow the errno
//! values the character-device layer reports to its callers.

use core::fmt;

use heapless::Vec;
use led_core::{ChannelId, OutputDriver, ParseError, SubmitError, parse};

use crate::log::{log_read_failed, log_session, log_unknown_minor, log_write_rejected};
use crate::scheduler::{CompletionHook, LedController, LogCompletions};

/// Writes of this many bytes or more are refused before parsing.
pub const MAX_MESSAGE_LEN: usize = 32;

/// Bytes produced by a single read.
pub const R_W_BUFF_LEN: usize = 1;

/// Result status of a control call.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ControlStatus {
    Ok,
    /// Malformed or out-of-range write (`EINVAL`).
    InvalidArgument,
    /// Minor number names no channel (`EBADRQC`).
    BadRequest,
    /// The channel queue refused the command (`EAGAIN`).
    TryAgain,
    /// The output could not be sampled (`EIO`).
    Io,
}

impl ControlStatus {
    /// Negated errno value, `0` on success.
    pub const fn errno(self) -> i32 {
        match self {
            ControlStatus::Ok => 0,
            ControlStatus::InvalidArgument => -22,
            ControlStatus::BadRequest => -56,
            ControlStatus::TryAgain => -11,
            ControlStatus::Io => -5,
        }
    }

    pub const fn is_ok(self) -> bool {
        matches!(self, ControlStatus::Ok)
    }
}

impl fmt::Display for ControlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ControlStatus::Ok => "ok",
            ControlStatus::InvalidArgument => "invalid argument",
            ControlStatus::BadRequest => "bad request",
            ControlStatus::TryAgain => "try again",
            ControlStatus::Io => "i/o error",
        };
        write!(f, "{label} ({})", self.errno())
    }
}

/// Reasons a write is refused.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WriteError {
    Parse(ParseError),
    Submit(SubmitError),
}

impl WriteError {
    pub const fn status(self) -> ControlStatus {
        match self {
            WriteError::Parse(_) => ControlStatus::InvalidArgument,
            WriteError::Submit(_) => ControlStatus::TryAgain,
        }
    }
}

impl From<ParseError> for WriteError {
    fn from(value: ParseError) -> Self {
        WriteError::Parse(value)
    }
}

impl From<SubmitError> for WriteError {
    fn from(value: SubmitError) -> Self {
        WriteError::Submit(value)
    }
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::Parse(err) => write!(f, "parse error: {err}"),
            WriteError::Submit(err) => write!(f, "submit error: {err}"),
        }
    }
}

/// A control write copied out of the caller's buffer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ControlMessage {
    bytes: Vec<u8, MAX_MESSAGE_LEN>,
}

impl ControlMessage {
    /// Copies `buffer`, refusing anything that reaches [`MAX_MESSAGE_LEN`].
    pub fn from_bytes(buffer: &[u8]) -> Result<Self, ParseError> {
        let too_long = ParseError::TooLong {
            len: buffer.len(),
            max: MAX_MESSAGE_LEN,
        };
        if buffer.len() >= MAX_MESSAGE_LEN {
            return Err(too_long);
        }

        let mut bytes = Vec::new();
        bytes.extend_from_slice(buffer).map_err(|_| too_long)?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Entry points of the per-channel control device.
pub struct ControlInterface<'a, D, H = LogCompletions> {
    controller: &'a LedController<D, H>,
}

impl<'a, D: OutputDriver, H: CompletionHook> ControlInterface<'a, D, H> {
    pub const fn new(controller: &'a LedController<D, H>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &'a LedController<D, H> {
        self.controller
    }

    pub fn on_open(&self, minor: u32) -> ControlStatus {
        self.session(minor, true)
    }

    pub fn on_release(&self, minor: u32) -> ControlStatus {
        self.session(minor, false)
    }

    /// Parses `buffer` and queues the command on the channel for `minor`.
    ///
    /// Returns the number of bytes consumed: all of them on success, none on
    /// any failure. Never waits for the command to run.
    pub fn on_write(&self, minor: u32, buffer: &[u8]) -> (usize, ControlStatus) {
        let Some(channel) = ChannelId::from_minor(minor) else {
            log_unknown_minor(minor);
            return (0, ControlStatus::BadRequest);
        };

        match self.write(channel, buffer) {
            Ok(()) => (buffer.len(), ControlStatus::Ok),
            Err(WriteError::Parse(err)) => {
                log_write_rejected(minor, err);
                (0, ControlStatus::InvalidArgument)
            }
            // Rejected submissions are logged by the scheduler.
            Err(err) => (0, err.status()),
        }
    }

    /// Reads the current output level of the channel for `minor` as `0`/`1`.
    pub fn on_read(&self, minor: u32) -> (u8, ControlStatus) {
        let Some(channel) = ChannelId::from_minor(minor) else {
            log_unknown_minor(minor);
            return (0, ControlStatus::BadRequest);
        };

        match self.controller.read_output(channel) {
            Ok(level) => (level.as_byte(), ControlStatus::Ok),
            Err(err) => {
                log_read_failed(channel, &err);
                (0, ControlStatus::Io)
            }
        }
    }

    fn write(&self, channel: ChannelId, buffer: &[u8]) -> Result<(), WriteError> {
        let message = ControlMessage::from_bytes(buffer)?;
        let command = parse(message.as_bytes())?;
        self.controller.submit(channel, command)?;
        Ok(())
    }

    fn session(&self, minor: u32, opened: bool) -> ControlStatus {
        match ChannelId::from_minor(minor) {
            Some(channel) => {
                log_session(channel, opened);
                ControlStatus::Ok
            }
            None => {
                log_unknown_minor(minor);
                ControlStatus::BadRequest
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedOutputs;
    use led_core::{Command, EnqueueFailure, KeyedCommandQueue, Level};

    #[test]
    fn write_consumes_whole_buffer() {
        let controller = LedController::new(SimulatedOutputs::new());
        let control = ControlInterface::new(&controller);

        assert_eq!(control.on_write(0, b"2 5 200\n"), (8, ControlStatus::Ok));
        assert_eq!(
            controller.state(ChannelId::Red).read(),
            Some(Command::blink(5, 200).unwrap())
        );
    }

    #[test]
    fn rejected_write_consumes_nothing() {
        let controller = LedController::new(SimulatedOutputs::new());
        let control = ControlInterface::new(&controller);

        assert_eq!(
            control.on_write(1, b"2 500 50"),
            (0, ControlStatus::InvalidArgument)
        );
        assert_eq!(control.on_write(1, b"7"), (0, ControlStatus::InvalidArgument));
        assert_eq!(control.on_write(1, b""), (0, ControlStatus::InvalidArgument));
        assert_eq!(controller.state(ChannelId::Blue).read(), None);
        assert_eq!(controller.queues().len(ChannelId::Blue), Some(0));
    }

    #[test]
    fn long_write_is_refused() {
        let message = [b'1'; MAX_MESSAGE_LEN];
        assert_eq!(
            ControlMessage::from_bytes(&message),
            Err(ParseError::TooLong {
                len: MAX_MESSAGE_LEN,
                max: MAX_MESSAGE_LEN
            })
        );
        assert!(ControlMessage::from_bytes(&message[..MAX_MESSAGE_LEN - 1]).is_ok());
    }

    #[test]
    fn unknown_minor_is_a_bad_request() {
        let controller = LedController::new(SimulatedOutputs::new());
        let control = ControlInterface::new(&controller);

        assert_eq!(control.on_open(2), ControlStatus::BadRequest);
        assert_eq!(control.on_write(2, b"1"), (0, ControlStatus::BadRequest));
        assert_eq!(control.on_read(9), (0, ControlStatus::BadRequest));
        assert_eq!(control.on_release(0), ControlStatus::Ok);
    }

    #[test]
    fn read_reports_output_level() {
        let controller = LedController::new(SimulatedOutputs::new());
        let control = ControlInterface::new(&controller);
        controller
            .driver()
            .set_output(ChannelId::Blue, Level::Active)
            .unwrap();

        assert_eq!(control.on_read(1), (1, ControlStatus::Ok));
        assert_eq!(control.on_read(0), (0, ControlStatus::Ok));

        controller.driver().set_failing(ChannelId::Blue, true);
        assert_eq!(control.on_read(1), (0, ControlStatus::Io));
    }

    #[test]
    fn full_queue_asks_caller_to_retry() {
        let controller = LedController::new(SimulatedOutputs::new());
        let control = ControlInterface::new(&controller);
        for _ in 0..crate::scheduler::CHANNEL_QUEUE_DEPTH {
            assert!(control.on_write(0, b"0").1.is_ok());
        }

        let (consumed, status) = control.on_write(0, b"1");
        assert_eq!((consumed, status), (0, ControlStatus::TryAgain));
        assert_eq!(status.errno(), -11);
        assert_eq!(
            WriteError::from(SubmitError::from(EnqueueFailure::QueueFull)).status(),
            ControlStatus::TryAgain
        );
    }
}
