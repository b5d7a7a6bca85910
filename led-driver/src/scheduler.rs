//! Per-channel command scheduling.
//!
//! Every channel owns a bounded FIFO and one worker future that drains it,
//! so commands for a channel run strictly in submission order while the
//! channels progress independently. [`LedController::submit`] only takes the
//! channel lock long enough to enqueue and update the ledger; the worker is
//! the only code that sleeps or touches the channel output.

use core::fmt::Debug;

use embassy_futures::join::join_array;
use embassy_futures::select::{Either, select};
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use led_core::{
    ALL_CHANNELS, CHANNEL_COUNT, ChannelId, Command, EnqueueFailure, ExecutionError,
    ExecutionOutcome, KeyedCommandQueue, Level, OutputDriver, SubmitError,
};

use crate::engine::execute;
use crate::log::{
    log_failed, log_finished, log_parked, log_shutdown, log_started, log_submit_rejected,
    log_submitted,
};
use crate::state::{ChannelSnapshot, ChannelState, StateMutex};

/// Commands a channel can hold before submissions are refused.
pub const CHANNEL_QUEUE_DEPTH: usize = 8;

/// Bounded FIFO feeding one channel worker.
pub type ChannelQueue = Channel<StateMutex, Command, CHANNEL_QUEUE_DEPTH>;

/// Receives the result of every execution.
pub trait CompletionHook {
    fn on_complete<E: Debug>(
        &self,
        channel: ChannelId,
        command: Command,
        result: &Result<ExecutionOutcome, ExecutionError<E>>,
    );
}

/// Default hook: logs the outcome and moves on.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogCompletions;

impl CompletionHook for LogCompletions {
    fn on_complete<E: Debug>(
        &self,
        channel: ChannelId,
        command: Command,
        result: &Result<ExecutionOutcome, ExecutionError<E>>,
    ) {
        match result {
            Ok(outcome) => log_finished(channel, command, *outcome),
            Err(error) => log_failed(channel, command, error),
        }
    }
}

struct ChannelSlot {
    id: ChannelId,
    state: ChannelState,
    queue: ChannelQueue,
    stop: Signal<StateMutex, ()>,
}

impl ChannelSlot {
    const fn new(id: ChannelId) -> Self {
        Self {
            id,
            state: ChannelState::new(),
            queue: Channel::new(),
            stop: Signal::new(),
        }
    }
}

/// The per-channel FIFOs, addressable by [`ChannelId`].
pub struct ChannelQueues {
    slots: [ChannelSlot; CHANNEL_COUNT],
}

impl ChannelQueues {
    const fn new() -> Self {
        Self {
            slots: [
                ChannelSlot::new(ALL_CHANNELS[0].id),
                ChannelSlot::new(ALL_CHANNELS[1].id),
            ],
        }
    }

    fn slot(&self, channel: ChannelId) -> &ChannelSlot {
        &self.slots[channel.as_index()]
    }
}

impl KeyedCommandQueue for ChannelQueues {
    fn try_enqueue(&self, key: ChannelId, command: Command) -> Result<(), EnqueueFailure> {
        self.slot(key)
            .queue
            .try_send(command)
            .map_err(|_| EnqueueFailure::QueueFull)
    }

    fn capacity(&self) -> Option<usize> {
        Some(CHANNEL_QUEUE_DEPTH)
    }

    fn len(&self, key: ChannelId) -> Option<usize> {
        Some(self.slot(key).queue.len())
    }
}

/// Owns the channel state, queues and output driver, and runs the workers.
///
/// Designed to live in a `static` (or a `StaticCell`) so submitters on other
/// contexts can hold a shared reference while the workers run.
pub struct LedController<D, H = LogCompletions> {
    driver: D,
    hook: H,
    queues: ChannelQueues,
}

impl<D: OutputDriver> LedController<D> {
    pub const fn new(driver: D) -> Self {
        Self::with_hook(driver, LogCompletions)
    }
}

impl<D: OutputDriver, H: CompletionHook> LedController<D, H> {
    pub const fn with_hook(driver: D, hook: H) -> Self {
        Self {
            driver,
            hook,
            queues: ChannelQueues::new(),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn hook(&self) -> &H {
        &self.hook
    }

    pub fn queues(&self) -> &ChannelQueues {
        &self.queues
    }

    pub fn state(&self, channel: ChannelId) -> &ChannelState {
        &self.queues.slot(channel).state
    }

    pub fn snapshot(&self, channel: ChannelId) -> ChannelSnapshot {
        self.state(channel).snapshot()
    }

    /// Queues `command` on `channel` without waiting for it to run.
    ///
    /// A switch submitted while a blink is queued or running raises the
    /// channel's cancellation flag so the blink stops at its next pulse
    /// boundary. A blink submitted behind a blink simply waits its turn.
    pub fn submit(&self, channel: ChannelId, command: Command) -> Result<(), SubmitError> {
        let state = self.state(channel);
        match state.admit(command, || self.queues.try_enqueue(channel, command)) {
            Ok(admission) => {
                log_submitted(channel, command, admission.raise_cancel);
                Ok(())
            }
            Err(failure) => {
                log_submit_rejected(channel, command, failure);
                Err(failure.into())
            }
        }
    }

    /// Samples the channel output through the driver.
    pub fn read_output(&self, channel: ChannelId) -> Result<Level, D::Error> {
        self.driver.get_output(channel)
    }

    /// Refuses further work, cancels running blinks and stops the workers.
    ///
    /// Workers discard whatever is still queued and park their output
    /// inactive before [`LedController::run`] returns.
    pub fn shutdown(&self) {
        log_shutdown();
        for slot in &self.queues.slots {
            slot.state.close();
            slot.stop.signal(());
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.queues
            .slots
            .iter()
            .all(|slot| slot.state.is_closed())
    }

    /// Runs every channel worker until [`LedController::shutdown`].
    pub async fn run(&self) {
        join_array(ALL_CHANNELS.map(|line| self.run_channel(line.id))).await;
    }

    /// Runs the worker for one channel until [`LedController::shutdown`].
    ///
    /// At most one worker may run per channel.
    pub async fn run_channel(&self, channel: ChannelId) {
        let slot = self.queues.slot(channel);

        while !slot.state.is_closed() {
            match select(slot.queue.receive(), slot.stop.wait()).await {
                Either::First(command) => self.dispatch(slot, command).await,
                Either::Second(()) => {}
            }
        }

        self.park(slot);
    }

    async fn dispatch(&self, slot: &ChannelSlot, command: Command) {
        slot.state.begin(command);
        log_started(slot.id, command);

        let result = execute(&self.driver, slot.id, command, slot.state.cancel_token()).await;
        match &result {
            Ok(outcome) => slot.state.finish(command, *outcome),
            Err(_) => slot.state.fail(command),
        }
        self.hook.on_complete(slot.id, command, &result);
    }

    fn park(&self, slot: &ChannelSlot) {
        let mut discarded = 0;
        while let Ok(command) = slot.queue.try_receive() {
            slot.state.discard(command);
            discarded += 1;
        }

        let result = self.driver.set_output(slot.id, Level::Inactive);
        log_parked(slot.id, discarded, result.as_ref().err());
    }
}
