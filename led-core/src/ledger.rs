//! Per-channel command bookkeeping.
//!
//! The ledger is the data half of a channel's state: the most recently
//! accepted command, what the worker is doing right now, and how many
//! commands of each class are still in flight. It holds no lock and no
//! atomics; the driver wraps it in the channel mutex and keeps the
//! cancellation flag beside it.
//!
//! Cancellation bookkeeping follows two rules:
//!
//! * admitting `TurnOff`/`TurnOn` while any blink is queued or running asks
//!   for cancellation, so every blink submitted before the switch winds down;
//! * the flag may only be cleared when the last queued switch starts, which
//!   keeps it raised across any blink still sitting between two switches.

use core::fmt;

use crate::channel::Level;
use crate::command::{BlinkParams, Command};

/// What a channel worker is doing.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum ChannelActivity {
    #[default]
    Idle,
    /// Driving a single `TurnOff`/`TurnOn` to the given level.
    Executing(Level),
    Blinking(BlinkParams),
}

impl ChannelActivity {
    /// Activity entered when the worker starts `command`.
    pub const fn for_command(command: Command) -> Self {
        match command {
            Command::TurnOff => ChannelActivity::Executing(Level::Inactive),
            Command::TurnOn => ChannelActivity::Executing(Level::Active),
            Command::Blink(params) => ChannelActivity::Blinking(params),
        }
    }

    pub const fn is_idle(self) -> bool {
        matches!(self, ChannelActivity::Idle)
    }

    pub const fn is_blinking(self) -> bool {
        matches!(self, ChannelActivity::Blinking(_))
    }
}

impl fmt::Display for ChannelActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelActivity::Idle => f.write_str("idle"),
            ChannelActivity::Executing(Level::Active) => f.write_str("switching on"),
            ChannelActivity::Executing(Level::Inactive) => f.write_str("switching off"),
            ChannelActivity::Blinking(params) => write!(
                f,
                "blinking count={} interval={}ms",
                params.count(),
                params.interval_ms()
            ),
        }
    }
}

/// Result of a finished execution.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExecutionOutcome {
    /// A `TurnOff`/`TurnOn` drove the output to this level.
    Switched(Level),
    /// A blink ran every requested pulse.
    Blinked { pulses: u32 },
    /// A blink observed cancellation after `pulses` complete pulses.
    Cancelled { pulses: u32 },
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionOutcome::Switched(Level::Active) => f.write_str("on"),
            ExecutionOutcome::Switched(Level::Inactive) => f.write_str("off"),
            ExecutionOutcome::Blinked { pulses } => write!(f, "blinked {pulses} pulses"),
            ExecutionOutcome::Cancelled { pulses } => {
                write!(f, "blink cancelled after {pulses} pulses")
            }
        }
    }
}

/// Decision returned when a command is admitted to a channel.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Admission {
    /// The caller must raise the channel's cancellation signal.
    pub raise_cancel: bool,
}

/// Bookkeeping for one channel.
#[derive(Clone, Debug, Default)]
pub struct CommandLedger {
    pending: Option<Command>,
    activity: ChannelActivity,
    queued_blinks: usize,
    queued_switches: usize,
    last_outcome: Option<ExecutionOutcome>,
    completed: u32,
    failures: u32,
}

impl CommandLedger {
    /// Creates an idle ledger with no command recorded.
    pub const fn new() -> Self {
        Self {
            pending: None,
            activity: ChannelActivity::Idle,
            queued_blinks: 0,
            queued_switches: 0,
            last_outcome: None,
            completed: 0,
            failures: 0,
        }
    }

    /// Most recently accepted command, if any.
    pub const fn pending(&self) -> Option<Command> {
        self.pending
    }

    /// Overwrites the most recently accepted command.
    pub fn record(&mut self, command: Command) {
        self.pending = Some(command);
    }

    /// Current worker activity.
    pub const fn activity(&self) -> ChannelActivity {
        self.activity
    }

    /// Blinks accepted and not yet finished, including a running one.
    pub const fn queued_blinks(&self) -> usize {
        self.queued_blinks
    }

    /// Switch commands accepted and not yet started.
    pub const fn queued_switches(&self) -> usize {
        self.queued_switches
    }

    pub const fn last_outcome(&self) -> Option<ExecutionOutcome> {
        self.last_outcome
    }

    /// Executions that finished without a hardware failure.
    pub const fn completed(&self) -> u32 {
        self.completed
    }

    /// Executions that ended in a hardware failure.
    pub const fn failures(&self) -> u32 {
        self.failures
    }

    /// Records a command that has been placed on the channel queue.
    ///
    /// Must only be called once the enqueue succeeded; a rejected command
    /// leaves the ledger untouched.
    pub fn admit(&mut self, command: Command) -> Admission {
        let raise_cancel = command.is_switch() && self.queued_blinks > 0;

        if command.is_switch() {
            self.queued_switches += 1;
        } else {
            self.queued_blinks += 1;
        }
        self.pending = Some(command);

        Admission { raise_cancel }
    }

    /// Marks `command` as started by the worker.
    ///
    /// Returns `true` when the caller should clear the cancellation signal.
    pub fn begin(&mut self, command: Command) -> bool {
        self.activity = ChannelActivity::for_command(command);

        if command.is_switch() {
            self.queued_switches = self.queued_switches.saturating_sub(1);
            self.queued_switches == 0
        } else {
            false
        }
    }

    /// Marks the running command as finished with `outcome`.
    pub fn finish(&mut self, command: Command, outcome: ExecutionOutcome) {
        self.settle(command);
        self.last_outcome = Some(outcome);
        self.completed = self.completed.saturating_add(1);
    }

    /// Marks the running command as failed on the hardware side.
    pub fn fail(&mut self, command: Command) {
        self.settle(command);
        self.failures = self.failures.saturating_add(1);
    }

    /// Drops a command that was queued but never started.
    pub fn discard(&mut self, command: Command) {
        if command.is_switch() {
            self.queued_switches = self.queued_switches.saturating_sub(1);
        } else {
            self.queued_blinks = self.queued_blinks.saturating_sub(1);
        }
    }

    fn settle(&mut self, command: Command) {
        self.activity = ChannelActivity::Idle;
        if command.is_blink() {
            self.queued_blinks = self.queued_blinks.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blink() -> Command {
        Command::blink(10, 100).unwrap()
    }

    #[test]
    fn switch_on_idle_channel_does_not_cancel() {
        let mut ledger = CommandLedger::new();
        assert!(!ledger.admit(Command::TurnOn).raise_cancel);
        assert_eq!(ledger.pending(), Some(Command::TurnOn));
        assert_eq!(ledger.queued_switches(), 1);
    }

    #[test]
    fn blink_followed_by_blink_queues_without_cancel() {
        let mut ledger = CommandLedger::new();
        ledger.admit(blink());
        assert!(!ledger.admit(blink()).raise_cancel);
        assert_eq!(ledger.queued_blinks(), 2);
    }

    #[test]
    fn activity_tracks_worker_lifecycle() {
        let mut ledger = CommandLedger::new();
        let command = blink();
        ledger.admit(command);
        assert!(ledger.activity().is_idle());

        assert!(!ledger.begin(command));
        assert!(ledger.activity().is_blinking());

        ledger.finish(command, ExecutionOutcome::Blinked { pulses: 10 });
        assert!(ledger.activity().is_idle());
        assert_eq!(ledger.queued_blinks(), 0);
        assert_eq!(ledger.completed(), 1);
        assert_eq!(
            ledger.last_outcome(),
            Some(ExecutionOutcome::Blinked { pulses: 10 })
        );
    }

    #[test]
    fn failure_counts_and_settles() {
        let mut ledger = CommandLedger::new();
        ledger.admit(Command::TurnOn);
        ledger.begin(Command::TurnOn);
        ledger.fail(Command::TurnOn);

        assert_eq!(ledger.failures(), 1);
        assert_eq!(ledger.completed(), 0);
        assert!(ledger.activity().is_idle());
        assert!(ledger.last_outcome().is_none());
    }

    #[test]
    fn discard_releases_queued_counts() {
        let mut ledger = CommandLedger::new();
        ledger.admit(blink());
        ledger.admit(Command::TurnOff);
        ledger.discard(blink());
        ledger.discard(Command::TurnOff);

        assert_eq!(ledger.queued_blinks(), 0);
        assert_eq!(ledger.queued_switches(), 0);
    }
}
