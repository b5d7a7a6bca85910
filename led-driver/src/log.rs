//! Driver log events.
//!
//! Each helper has a `defmt` body for the target and a `tracing` body for
//! host builds, so call sites stay free of `cfg` noise.

use core::fmt::Debug;

use led_core::{ChannelId, Command, EnqueueFailure, ExecutionError, ExecutionOutcome, ParseError};

#[cfg(target_os = "none")]
pub(crate) fn log_submitted(channel: ChannelId, command: Command, cancel: bool) {
    defmt::info!(
        "led:{} queued {} cancel={}",
        channel.name(),
        defmt::Display2Format(&command),
        cancel
    );
}

#[cfg(not(target_os = "none"))]
pub(crate) fn log_submitted(channel: ChannelId, command: Command, cancel: bool) {
    tracing::info!(channel = channel.name(), %command, cancel, "command queued");
}

#[cfg(target_os = "none")]
pub(crate) fn log_submit_rejected(channel: ChannelId, command: Command, failure: EnqueueFailure) {
    defmt::warn!(
        "led:{} rejected {}: {}",
        channel.name(),
        defmt::Display2Format(&command),
        defmt::Display2Format(&failure)
    );
}

#[cfg(not(target_os = "none"))]
pub(crate) fn log_submit_rejected(channel: ChannelId, command: Command, failure: EnqueueFailure) {
    tracing::warn!(channel = channel.name(), %command, %failure, "command rejected");
}

#[cfg(target_os = "none")]
pub(crate) fn log_started(channel: ChannelId, command: Command) {
    defmt::debug!(
        "led:{} start {}",
        channel.name(),
        defmt::Display2Format(&command)
    );
}

#[cfg(not(target_os = "none"))]
pub(crate) fn log_started(channel: ChannelId, command: Command) {
    tracing::debug!(channel = channel.name(), %command, "execution started");
}

#[cfg(target_os = "none")]
pub(crate) fn log_finished(channel: ChannelId, command: Command, outcome: ExecutionOutcome) {
    defmt::info!(
        "led:{} {} -> {}",
        channel.name(),
        defmt::Display2Format(&command),
        defmt::Display2Format(&outcome)
    );
}

#[cfg(not(target_os = "none"))]
pub(crate) fn log_finished(channel: ChannelId, command: Command, outcome: ExecutionOutcome) {
    tracing::info!(channel = channel.name(), %command, %outcome, "execution finished");
}

#[cfg(target_os = "none")]
pub(crate) fn log_failed<E: Debug>(channel: ChannelId, command: Command, error: &ExecutionError<E>) {
    defmt::error!(
        "led:{} {} failed: {}",
        channel.name(),
        defmt::Display2Format(&command),
        defmt::Debug2Format(error)
    );
}

#[cfg(not(target_os = "none"))]
pub(crate) fn log_failed<E: Debug>(channel: ChannelId, command: Command, error: &ExecutionError<E>) {
    tracing::error!(channel = channel.name(), %command, ?error, "execution failed");
}

#[cfg(target_os = "none")]
pub(crate) fn log_parked<E: Debug>(channel: ChannelId, discarded: usize, error: Option<&E>) {
    match error {
        Some(error) => defmt::warn!(
            "led:{} stopped, dropped {} queued, park failed: {}",
            channel.name(),
            discarded,
            defmt::Debug2Format(error)
        ),
        None => defmt::info!("led:{} stopped, dropped {} queued", channel.name(), discarded),
    }
}

#[cfg(not(target_os = "none"))]
pub(crate) fn log_parked<E: Debug>(channel: ChannelId, discarded: usize, error: Option<&E>) {
    match error {
        Some(error) => tracing::warn!(
            channel = channel.name(),
            discarded,
            ?error,
            "worker stopped, output park failed"
        ),
        None => tracing::info!(channel = channel.name(), discarded, "worker stopped"),
    }
}

#[cfg(target_os = "none")]
pub(crate) fn log_shutdown() {
    defmt::info!("led: shutdown requested");
}

#[cfg(not(target_os = "none"))]
pub(crate) fn log_shutdown() {
    tracing::info!("shutdown requested");
}

#[cfg(target_os = "none")]
pub(crate) fn log_write_rejected(minor: u32, error: ParseError) {
    defmt::warn!(
        "ctl:{} bad write: {}",
        minor,
        defmt::Display2Format(&error)
    );
}

#[cfg(not(target_os = "none"))]
pub(crate) fn log_write_rejected(minor: u32, error: ParseError) {
    tracing::warn!(minor, %error, "control write rejected");
}

#[cfg(target_os = "none")]
pub(crate) fn log_unknown_minor(minor: u32) {
    defmt::warn!("ctl:{} unknown minor", minor);
}

#[cfg(not(target_os = "none"))]
pub(crate) fn log_unknown_minor(minor: u32) {
    tracing::warn!(minor, "unknown minor number");
}

#[cfg(target_os = "none")]
pub(crate) fn log_session(channel: ChannelId, opened: bool) {
    if opened {
        defmt::info!("ctl:{} open", channel.name());
    } else {
        defmt::info!("ctl:{} release", channel.name());
    }
}

#[cfg(not(target_os = "none"))]
pub(crate) fn log_session(channel: ChannelId, opened: bool) {
    if opened {
        tracing::info!(channel = channel.name(), "control session opened");
    } else {
        tracing::info!(channel = channel.name(), "control session released");
    }
}

#[cfg(target_os = "none")]
pub(crate) fn log_read_failed<E: Debug>(channel: ChannelId, error: &E) {
    defmt::error!(
        "ctl:{} read failed: {}",
        channel.name(),
        defmt::Debug2Format(error)
    );
}

#[cfg(not(target_os = "none"))]
pub(crate) fn log_read_failed<E: Debug>(channel: ChannelId, error: &E) {
    tracing::error!(channel = channel.name(), ?error, "output read failed");
}
