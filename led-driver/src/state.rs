//! Shared per-channel state.
//!
//! The ledger and the closed flag live behind a critical-section mutex so
//! submitters on any thread or interrupt context can update them. The
//! cancellation flag is a separate atomic: the blink loop polls it between
//! pulses without taking the lock.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use led_core::{
    Admission, ChannelActivity, Command, CommandLedger, EnqueueFailure, ExecutionOutcome,
};
use portable_atomic::{AtomicBool, Ordering};

/// Raw mutex guarding channel state and queues.
pub type StateMutex = CriticalSectionRawMutex;

#[derive(Debug)]
struct ChannelInner {
    ledger: CommandLedger,
    closed: bool,
}

/// Lock-protected bookkeeping plus the cancellation signal for one channel.
pub struct ChannelState {
    inner: Mutex<StateMutex, RefCell<ChannelInner>>,
    cancel: AtomicBool,
}

impl ChannelState {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(ChannelInner {
                ledger: CommandLedger::new(),
                closed: false,
            })),
            cancel: AtomicBool::new(false),
        }
    }

    /// Most recently accepted command.
    pub fn read(&self) -> Option<Command> {
        self.with_inner(|inner| inner.ledger.pending())
    }

    /// Overwrites the most recently accepted command.
    pub fn write(&self, command: Command) {
        self.with_inner(|inner| inner.ledger.record(command));
    }

    pub fn signal_cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn clear_cancel(&self) {
        self.cancel.store(false, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Read-only view of the cancellation flag handed to the engine.
    pub fn cancel_token(&self) -> CancelToken<'_> {
        CancelToken::new(&self.cancel)
    }

    /// Returns `true` once the channel stopped accepting work.
    pub fn is_closed(&self) -> bool {
        self.with_inner(|inner| inner.closed)
    }

    /// Consistent copy of the channel bookkeeping.
    pub fn snapshot(&self) -> ChannelSnapshot {
        let (ledger, closed) = self.with_inner(|inner| (inner.ledger.clone(), inner.closed));
        ChannelSnapshot {
            pending: ledger.pending(),
            activity: ledger.activity(),
            queued_blinks: ledger.queued_blinks(),
            queued_switches: ledger.queued_switches(),
            last_outcome: ledger.last_outcome(),
            completed: ledger.completed(),
            failures: ledger.failures(),
            cancel_requested: self.is_cancelled(),
            closed,
        }
    }

    /// Runs `enqueue` and records `command` atomically with respect to
    /// other submitters and to [`ChannelState::close`].
    ///
    /// The ledger is only touched once `enqueue` succeeds, so a refused
    /// command leaves no trace.
    pub(crate) fn admit<F>(&self, command: Command, enqueue: F) -> Result<Admission, EnqueueFailure>
    where
        F: FnOnce() -> Result<(), EnqueueFailure>,
    {
        self.with_inner(|inner| {
            if inner.closed {
                return Err(EnqueueFailure::ShuttingDown);
            }
            enqueue()?;
            let admission = inner.ledger.admit(command);
            if admission.raise_cancel {
                self.signal_cancel();
            }
            Ok(admission)
        })
    }

    /// Stops accepting work and asks any running blink to wind down.
    pub(crate) fn close(&self) {
        self.with_inner(|inner| {
            inner.closed = true;
            self.signal_cancel();
        });
    }

    pub(crate) fn begin(&self, command: Command) {
        // Clearing under the lock keeps a concurrent admit from raising the
        // flag between the ledger update and the store.
        self.with_inner(|inner| {
            if inner.ledger.begin(command) {
                self.clear_cancel();
            }
        });
    }

    pub(crate) fn finish(&self, command: Command, outcome: ExecutionOutcome) {
        self.with_inner(|inner| inner.ledger.finish(command, outcome));
    }

    pub(crate) fn fail(&self, command: Command) {
        self.with_inner(|inner| inner.ledger.fail(command));
    }

    pub(crate) fn discard(&self, command: Command) {
        self.with_inner(|inner| inner.ledger.discard(command));
    }

    fn with_inner<R>(&self, f: impl FnOnce(&mut ChannelInner) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of a channel's bookkeeping, used for status output.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ChannelSnapshot {
    pub pending: Option<Command>,
    pub activity: ChannelActivity,
    pub queued_blinks: usize,
    pub queued_switches: usize,
    pub last_outcome: Option<ExecutionOutcome>,
    pub completed: u32,
    pub failures: u32,
    pub cancel_requested: bool,
    pub closed: bool,
}

/// Cancellation flag as seen by a running execution.
#[derive(Copy, Clone)]
pub struct CancelToken<'a> {
    flag: &'a AtomicBool,
}

impl<'a> CancelToken<'a> {
    pub const fn new(flag: &'a AtomicBool) -> Self {
        Self { flag }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_after_blink_raises_cancel() {
        let state = ChannelState::new();
        let blink = Command::blink(10, 100).unwrap();

        state.admit(blink, || Ok(())).unwrap();
        assert!(!state.is_cancelled());

        let admission = state.admit(Command::TurnOff, || Ok(())).unwrap();
        assert!(admission.raise_cancel);
        assert!(state.is_cancelled());
        assert!(state.cancel_token().is_cancelled());
        assert_eq!(state.read(), Some(Command::TurnOff));
    }

    #[test]
    fn refused_enqueue_leaves_state_untouched() {
        let state = ChannelState::new();
        state.admit(Command::blink(10, 100).unwrap(), || Ok(())).unwrap();

        let result = state.admit(Command::TurnOn, || Err(EnqueueFailure::QueueFull));
        assert_eq!(result, Err(EnqueueFailure::QueueFull));
        assert!(!state.is_cancelled());
        assert!(state.read().is_some_and(Command::is_blink));
        assert_eq!(state.snapshot().queued_switches, 0);
    }

    #[test]
    fn closed_channel_refuses_before_enqueue() {
        let state = ChannelState::new();
        state.close();

        let result = state.admit(Command::TurnOn, || panic!("enqueue must not run"));
        assert_eq!(result, Err(EnqueueFailure::ShuttingDown));
        assert!(state.is_closed());
        assert!(state.is_cancelled());
    }

    #[test]
    fn last_switch_clears_cancel() {
        let state = ChannelState::new();
        let blink = Command::blink(10, 100).unwrap();
        state.admit(blink, || Ok(())).unwrap();
        state.admit(Command::TurnOff, || Ok(())).unwrap();
        state.admit(Command::TurnOn, || Ok(())).unwrap();

        state.begin(blink);
        state.finish(blink, ExecutionOutcome::Cancelled { pulses: 0 });
        state.begin(Command::TurnOff);
        assert!(state.is_cancelled());
        state.finish(Command::TurnOff, ExecutionOutcome::Switched(led_core::Level::Inactive));
        state.begin(Command::TurnOn);
        assert!(!state.is_cancelled());
    }

    #[test]
    fn write_overrides_pending() {
        let state = ChannelState::default();
        assert_eq!(state.read(), None);
        state.write(Command::TurnOn);
        assert_eq!(state.read(), Some(Command::TurnOn));
        assert_eq!(state.snapshot().queued_switches, 0);
    }
}
