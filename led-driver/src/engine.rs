//! Command execution against a channel output.

use embassy_time::{Duration, Timer};
use led_core::{
    BlinkParams, ChannelId, Command, ExecutionError, ExecutionOutcome, Level, OutputDriver,
};

use crate::state::CancelToken;

/// Performs `command` on `channel`.
///
/// Switches drive the output once. A blink runs up to `count` pulses, each
/// waiting one interval, driving the output active, waiting again and
/// driving it inactive. `cancel` is checked before each pulse; a cancelled
/// blink leaves the output where the last pulse put it.
/// Hardware errors abort the execution and are returned without retry.
pub async fn execute<D: OutputDriver>(
    driver: &D,
    channel: ChannelId,
    command: Command,
    cancel: CancelToken<'_>,
) -> Result<ExecutionOutcome, ExecutionError<D::Error>> {
    match command {
        Command::TurnOff => switch(driver, channel, Level::Inactive),
        Command::TurnOn => switch(driver, channel, Level::Active),
        Command::Blink(params) => blink(driver, channel, params, cancel).await,
    }
}

fn switch<D: OutputDriver>(
    driver: &D,
    channel: ChannelId,
    level: Level,
) -> Result<ExecutionOutcome, ExecutionError<D::Error>> {
    drive(driver, channel, level)?;
    Ok(ExecutionOutcome::Switched(level))
}

async fn blink<D: OutputDriver>(
    driver: &D,
    channel: ChannelId,
    params: BlinkParams,
    cancel: CancelToken<'_>,
) -> Result<ExecutionOutcome, ExecutionError<D::Error>> {
    let interval = core_duration_to_embassy(params.interval());

    for pulses in 0..params.count() {
        if cancel.is_cancelled() {
            return Ok(ExecutionOutcome::Cancelled { pulses });
        }
        Timer::after(interval).await;
        drive(driver, channel, Level::Active)?;
        Timer::after(interval).await;
        drive(driver, channel, Level::Inactive)?;
    }

    Ok(ExecutionOutcome::Blinked {
        pulses: params.count(),
    })
}

fn core_duration_to_embassy(duration: core::time::Duration) -> Duration {
    let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
    Duration::from_micros(micros)
}

fn drive<D: OutputDriver>(
    driver: &D,
    channel: ChannelId,
    level: Level,
) -> Result<(), ExecutionError<D::Error>> {
    driver
        .set_output(channel, level)
        .map_err(|source| ExecutionError::Output {
            channel,
            level,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimulatedFault, SimulatedOutputs};
    use embassy_futures::block_on;
    use embassy_time::Instant;
    use portable_atomic::AtomicBool;

    #[test]
    fn switches_drive_output_once() {
        let outputs = SimulatedOutputs::new();
        let flag = AtomicBool::new(false);

        let outcome = block_on(execute(
            &outputs,
            ChannelId::Red,
            Command::TurnOn,
            CancelToken::new(&flag),
        ));
        assert_eq!(outcome, Ok(ExecutionOutcome::Switched(Level::Active)));
        assert_eq!(outputs.level(ChannelId::Red), Level::Active);
        assert_eq!(outputs.transitions_for(ChannelId::Red).len(), 1);
        assert!(outputs.transitions_for(ChannelId::Blue).is_empty());
    }

    #[test]
    fn blink_pulses_and_ends_inactive() {
        let outputs = SimulatedOutputs::new();
        let flag = AtomicBool::new(false);
        let command = Command::blink(2, 100).unwrap();

        let outcome = block_on(execute(
            &outputs,
            ChannelId::Blue,
            command,
            CancelToken::new(&flag),
        ));
        assert_eq!(outcome, Ok(ExecutionOutcome::Blinked { pulses: 2 }));

        let levels: Vec<Level> = outputs
            .transitions_for(ChannelId::Blue)
            .iter()
            .map(|transition| transition.level)
            .collect();
        assert_eq!(
            levels,
            [Level::Active, Level::Inactive, Level::Active, Level::Inactive]
        );
    }

    #[test]
    fn blink_edges_land_one_interval_apart() {
        let outputs = SimulatedOutputs::new();
        let flag = AtomicBool::new(false);
        let command = Command::blink(2, 100).unwrap();

        let start = Instant::now();
        let outcome = block_on(execute(
            &outputs,
            ChannelId::Blue,
            command,
            CancelToken::new(&flag),
        ));
        assert_eq!(outcome, Ok(ExecutionOutcome::Blinked { pulses: 2 }));

        let transitions = outputs.transitions_for(ChannelId::Blue);
        assert_eq!(transitions.len(), 4);
        for (edge, transition) in transitions.iter().enumerate() {
            let offset = transition.at.duration_since(start).as_millis();
            let due = 100 * (edge as u64 + 1);
            assert!(
                offset >= due && offset <= due + 150,
                "edge {edge} at {offset} ms, due at {due} ms"
            );
        }
        for pair in transitions.windows(2) {
            let gap = pair[1].at.duration_since(pair[0].at).as_millis();
            assert!(gap >= 95, "edges only {gap} ms apart");
        }
    }

    #[test]
    fn raised_cancel_stops_before_first_pulse() {
        let outputs = SimulatedOutputs::new();
        let flag = AtomicBool::new(true);

        let outcome = block_on(execute(
            &outputs,
            ChannelId::Red,
            Command::blink(100, 2_500).unwrap(),
            CancelToken::new(&flag),
        ));
        assert_eq!(outcome, Ok(ExecutionOutcome::Cancelled { pulses: 0 }));
        assert!(outputs.transitions().is_empty());
    }

    #[test]
    fn hardware_failure_is_reported_without_retry() {
        let outputs = SimulatedOutputs::new();
        outputs.set_failing(ChannelId::Red, true);
        let flag = AtomicBool::new(false);

        let outcome = block_on(execute(
            &outputs,
            ChannelId::Red,
            Command::TurnOn,
            CancelToken::new(&flag),
        ));
        assert_eq!(
            outcome,
            Err(ExecutionError::Output {
                channel: ChannelId::Red,
                level: Level::Active,
                source: SimulatedFault {
                    channel: ChannelId::Red
                },
            })
        );
        assert_eq!(outputs.level(ChannelId::Red), Level::Inactive);
    }
}
