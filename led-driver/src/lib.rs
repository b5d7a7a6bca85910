#![cfg_attr(target_os = "none", no_std)]

//! Runtime half of the LED controller: channel state, the execution engine,
//! per-channel workers and the control-interface adapter.
//!
//! The crate builds for the MCU target with `defmt` logging and for the host
//! with `tracing`, where [`sim::SimulatedOutputs`] stands in for hardware.

pub mod control;
pub mod engine;
mod log;
pub mod scheduler;
pub mod state;

#[cfg(not(target_os = "none"))]
pub mod sim;

pub use control::{
    ControlInterface, ControlMessage, ControlStatus, MAX_MESSAGE_LEN, R_W_BUFF_LEN, WriteError,
};
pub use engine::execute;
pub use scheduler::{
    CHANNEL_QUEUE_DEPTH, ChannelQueue, ChannelQueues, CompletionHook, LedController,
    LogCompletions,
};
pub use state::{CancelToken, ChannelSnapshot, ChannelState, StateMutex};
