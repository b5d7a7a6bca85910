#![no_std]

// Shared logic for the LED channel controller.
//
// Everything here stays portable across MCU targets and host tooling: the
// command wire format, the channel catalog, per-channel bookkeeping and the
// traits the driver crate implements for queues and outputs.

pub mod channel;
pub mod command;
pub mod ledger;
pub mod output;
pub mod queue;

pub use channel::{ALL_CHANNELS, CHANNEL_COUNT, ChannelId, ChannelLine, Level, channel_by_id};
pub use command::{BlinkParams, Command, CommandKind, ParseError, ParseField, parse};
pub use ledger::{Admission, ChannelActivity, CommandLedger, ExecutionOutcome};
pub use output::OutputDriver;
pub use queue::{EnqueueFailure, ExecutionError, KeyedCommandQueue, SubmitError};
