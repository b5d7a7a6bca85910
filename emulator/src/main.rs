mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::thread;

use embassy_executor::Executor;
use embassy_futures::block_on;
use embassy_sync::channel::Channel;
use led_core::{ALL_CHANNELS, CHANNEL_COUNT, ChannelId};
use led_driver::StateMutex;
use led_driver::sim::SimulatedOutputs;
use session::{HostController, Session, TranscriptLogger};
use static_cell::StaticCell;
use tracing_subscriber::EnvFilter;

static CONTROLLER: HostController = HostController::new(SimulatedOutputs::new());
static EXECUTOR: StaticCell<Executor> = StaticCell::new();
static STOPPED: Channel<StateMutex, ChannelId, CHANNEL_COUNT> = Channel::new();

#[embassy_executor::task(pool_size = 2)]
async fn channel_worker(controller: &'static HostController, channel: ChannelId) {
    controller.run_channel(channel).await;
    // One slot per channel, so this cannot fail.
    let _ = STOPPED.try_send(channel);
}

fn main() -> io::Result<()> {
    init_tracing();

    let transcript = parse_transcript_path()
        .unwrap_or_else(|err| {
            eprintln!("{err}");
            eprintln!("Usage: led-emulator [--transcript <path>]");
            process::exit(2);
        })
        .map(|path| TranscriptLogger::create(&path))
        .transpose()?;

    thread::Builder::new()
        .name("led-workers".to_string())
        .spawn(run_workers)?;

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new(&CONTROLLER, transcript);
    let mut line = String::new();

    writeln!(
        writer,
        "LED Controller Emulator ready. Type `help` for commands or `exit` to quit."
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            break;
        }

        for response in session.handle_command(trimmed)? {
            writeln!(writer, "{response}")?;
        }
    }

    session.close()?;
    CONTROLLER.shutdown();
    for _ in ALL_CHANNELS {
        block_on(STOPPED.receive());
    }
    writeln!(writer, "Session closed.")?;

    Ok(())
}

fn run_workers() {
    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        for line in ALL_CHANNELS {
            spawner
                .spawn(channel_worker(&CONTROLLER, line.id))
                .expect("spawn channel worker");
        }
        tracing::info!(channels = ALL_CHANNELS.len(), "channel workers started");
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_transcript_path() -> Result<Option<PathBuf>, String> {
    let mut args = env::args().skip(1);
    match args.next() {
        None => Ok(None),
        Some(arg) => {
            if let Some(value) = arg.strip_prefix("--transcript=") {
                Ok(Some(PathBuf::from(value)))
            } else if arg == "--transcript" {
                args.next()
                    .map(|value| Some(PathBuf::from(value)))
                    .ok_or_else(|| "Expected value after --transcript".to_string())
            } else {
                Err(format!("Unknown argument `{arg}`"))
            }
        }
    }
}
