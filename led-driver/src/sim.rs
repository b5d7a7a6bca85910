//! Host-side output driver used by the emulator and tests.

use core::cell::RefCell;
use core::fmt;

use embassy_sync::blocking_mutex::Mutex;
use embassy_time::Instant;
use heapless::HistoryBuf;
use led_core::{CHANNEL_COUNT, ChannelId, Level, OutputDriver};

use crate::state::StateMutex;

/// Transitions kept before the oldest are dropped.
pub const TRANSITION_LOG_DEPTH: usize = 256;

/// A recorded level change.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    pub channel: ChannelId,
    pub level: Level,
    pub at: Instant,
}

/// Injected hardware failure.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SimulatedFault {
    pub channel: ChannelId,
}

impl fmt::Display for SimulatedFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "simulated fault on {}", self.channel)
    }
}

struct SimState {
    levels: [Level; CHANNEL_COUNT],
    failing: [bool; CHANNEL_COUNT],
    transitions: HistoryBuf<Transition, TRANSITION_LOG_DEPTH>,
}

/// In-memory outputs that log the most recent successful level changes.
pub struct SimulatedOutputs {
    state: Mutex<StateMutex, RefCell<SimState>>,
}

impl SimulatedOutputs {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(SimState {
                levels: [Level::Inactive; CHANNEL_COUNT],
                failing: [false; CHANNEL_COUNT],
                transitions: HistoryBuf::new(),
            })),
        }
    }

    pub fn level(&self, channel: ChannelId) -> Level {
        self.with_state(|state| state.levels[channel.as_index()])
    }

    /// Makes every subsequent access to `channel` fail until reset.
    pub fn set_failing(&self, channel: ChannelId, failing: bool) {
        self.with_state(|state| state.failing[channel.as_index()] = failing);
    }

    pub fn transitions(&self) -> Vec<Transition> {
        self.with_state(|state| state.transitions.oldest_ordered().copied().collect())
    }

    pub fn transitions_for(&self, channel: ChannelId) -> Vec<Transition> {
        self.with_state(|state| {
            state
                .transitions
                .oldest_ordered()
                .filter(|transition| transition.channel == channel)
                .copied()
                .collect()
        })
    }

    /// Number of times `channel` was driven active.
    pub fn pulses(&self, channel: ChannelId) -> usize {
        self.with_state(|state| {
            state
                .transitions
                .oldest_ordered()
                .filter(|transition| transition.channel == channel && transition.level.is_active())
                .count()
        })
    }

    pub fn clear_transitions(&self) {
        self.with_state(|state| state.transitions.clear());
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut SimState) -> R) -> R {
        self.state.lock(|cell| f(&mut cell.borrow_mut()))
    }
}

impl Default for SimulatedOutputs {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDriver for SimulatedOutputs {
    type Error = SimulatedFault;

    fn set_output(&self, channel: ChannelId, level: Level) -> Result<(), Self::Error> {
        self.with_state(|state| {
            if state.failing[channel.as_index()] {
                return Err(SimulatedFault { channel });
            }
            state.levels[channel.as_index()] = level;
            state.transitions.write(Transition {
                channel,
                level,
                at: Instant::now(),
            });
            Ok(())
        })
    }

    fn get_output(&self, channel: ChannelId) -> Result<Level, Self::Error> {
        self.with_state(|state| {
            if state.failing[channel.as_index()] {
                Err(SimulatedFault { channel })
            } else {
                Ok(state.levels[channel.as_index()])
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_transitions_per_channel() {
        let outputs = SimulatedOutputs::new();
        outputs.set_output(ChannelId::Red, Level::Active).unwrap();
        outputs.set_output(ChannelId::Blue, Level::Active).unwrap();
        outputs.set_output(ChannelId::Red, Level::Inactive).unwrap();

        assert_eq!(outputs.transitions().len(), 3);
        assert_eq!(outputs.transitions_for(ChannelId::Red).len(), 2);
        assert_eq!(outputs.pulses(ChannelId::Red), 1);
        assert_eq!(outputs.get_output(ChannelId::Blue), Ok(Level::Active));

        outputs.clear_transitions();
        assert!(outputs.transitions().is_empty());
        assert_eq!(outputs.level(ChannelId::Blue), Level::Active);
    }

    #[test]
    fn transition_log_keeps_newest_entries() {
        let outputs = SimulatedOutputs::new();
        let writes = TRANSITION_LOG_DEPTH + 10;
        for write in 0..writes {
            let level = if write % 2 == 0 { Level::Active } else { Level::Inactive };
            outputs.set_output(ChannelId::Red, level).unwrap();
        }
        outputs.set_output(ChannelId::Blue, Level::Active).unwrap();

        let transitions = outputs.transitions();
        assert_eq!(transitions.len(), TRANSITION_LOG_DEPTH);
        let last = transitions[TRANSITION_LOG_DEPTH - 1];
        assert_eq!((last.channel, last.level), (ChannelId::Blue, Level::Active));
        // The eleven oldest red writes were dropped; write 11 is inactive.
        assert_eq!(transitions[0].level, Level::Inactive);
        assert!(transitions.windows(2).all(|pair| pair[0].at <= pair[1].at));
        assert_eq!(outputs.level(ChannelId::Red), Level::Inactive);
    }

    #[test]
    fn failing_channel_keeps_its_level() {
        let outputs = SimulatedOutputs::new();
        outputs.set_failing(ChannelId::Blue, true);

        assert_eq!(
            outputs.set_output(ChannelId::Blue, Level::Active),
            Err(SimulatedFault {
                channel: ChannelId::Blue
            })
        );
        assert!(outputs.get_output(ChannelId::Blue).is_err());
        assert_eq!(outputs.get_output(ChannelId::Red), Ok(Level::Inactive));

        outputs.set_failing(ChannelId::Blue, false);
        assert_eq!(outputs.get_output(ChannelId::Blue), Ok(Level::Inactive));
    }
}
