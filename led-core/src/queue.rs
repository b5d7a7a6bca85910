//! Queue-facing abstractions and the error types surfaced around them.
//!
//! The scheduler needs an ordered work queue per channel: commands for one
//! key are delivered in FIFO order, different keys progress independently.
//! The driver crate provides the concrete queue; the traits and errors here
//! keep the contract executor-agnostic.

use core::fmt;

use crate::channel::{ChannelId, Level};
use crate::command::Command;

/// Reason an enqueue attempt was refused.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EnqueueFailure {
    /// The channel queue has reached its capacity.
    QueueFull,
    /// The controller is shutting down and no longer accepts work.
    ShuttingDown,
}

impl fmt::Display for EnqueueFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnqueueFailure::QueueFull => f.write_str("queue full"),
            EnqueueFailure::ShuttingDown => f.write_str("shutting down"),
        }
    }
}

/// Error returned to the submitter when a command cannot be scheduled.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SubmitError {
    /// The channel's work queue cannot accept the command.
    QueueUnavailable(EnqueueFailure),
}

impl From<EnqueueFailure> for SubmitError {
    fn from(value: EnqueueFailure) -> Self {
        SubmitError::QueueUnavailable(value)
    }
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::QueueUnavailable(reason) => write!(f, "queue unavailable ({reason})"),
        }
    }
}

/// Hardware failure raised while executing a command.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExecutionError<E> {
    /// The output driver rejected a level change.
    Output {
        channel: ChannelId,
        level: Level,
        source: E,
    },
}

impl<E: fmt::Debug> fmt::Display for ExecutionError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::Output {
                channel,
                level,
                source,
            } => write!(
                f,
                "{channel}: failed to drive output {}: {source:?}",
                level.as_byte()
            ),
        }
    }
}

/// Ordered per-key command queue.
///
/// Implementations guarantee FIFO delivery per key and independent progress
/// across keys. Enqueueing never blocks.
pub trait KeyedCommandQueue {
    /// Attempts to enqueue `command` for `key` without blocking.
    fn try_enqueue(&self, key: ChannelId, command: Command) -> Result<(), EnqueueFailure>;

    /// Returns the per-key capacity if it is known.
    fn capacity(&self) -> Option<usize> {
        None
    }

    /// Returns the current depth of the queue for `key` if it can be observed.
    fn len(&self, _key: ChannelId) -> Option<usize> {
        None
    }

    /// Remaining slots for `key` when both capacity and length are known.
    fn remaining(&self, key: ChannelId) -> Option<usize> {
        match (self.capacity(), self.len(key)) {
            (Some(capacity), Some(len)) => Some(capacity.saturating_sub(len)),
            _ => None,
        }
    }
}
