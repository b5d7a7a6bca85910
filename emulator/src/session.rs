use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant as HostInstant};

use crossterm::style::Stylize;
use led_core::{ALL_CHANNELS, ChannelId, ChannelLine, KeyedCommandQueue, Level};
use led_driver::sim::SimulatedOutputs;
use led_driver::{
    CHANNEL_QUEUE_DEPTH, ChannelSnapshot, ControlInterface, LedController, R_W_BUFF_LEN,
};

pub type HostController = LedController<SimulatedOutputs>;

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "write",
        "<red|blue|minor> <payload>    - write a control payload (`0`, `1`, `2 <count> <ms>`)",
    ),
    (
        "read",
        "read <red|blue|minor>         - read the current output level",
    ),
    (
        "fail",
        "fail <red|blue> <on|off>      - inject or clear a simulated output fault",
    ),
    (
        "status",
        "status                        - display channel state",
    ),
    (
        "help",
        "help [topic]                  - show help for a command",
    ),
];

pub struct Session<'a> {
    control: ControlInterface<'a, SimulatedOutputs>,
    transcript: Option<TranscriptLogger>,
    started_at: HostInstant,
}

impl<'a> Session<'a> {
    pub fn new(controller: &'a HostController, transcript: Option<TranscriptLogger>) -> Self {
        let control = ControlInterface::new(controller);
        for line in ALL_CHANNELS {
            control.on_open(line.minor);
        }

        Self {
            control,
            transcript,
            started_at: HostInstant::now(),
        }
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.started_at.elapsed();
        self.record(elapsed, TranscriptRole::Host, &[trimmed.to_string()])?;

        let (head, rest) = split_word(trimmed);
        let lines = if head.eq_ignore_ascii_case("help") {
            handle_help(rest)
        } else if head.eq_ignore_ascii_case("status") {
            self.handle_status()
        } else if head.eq_ignore_ascii_case("read") {
            self.handle_read(rest)
        } else if head.eq_ignore_ascii_case("fail") {
            self.handle_fail(rest)
        } else {
            self.handle_write(head, rest)
        };

        self.record(elapsed, TranscriptRole::Emulator, &lines)?;
        Ok(lines)
    }

    /// Releases the control sessions opened in [`Session::new`].
    pub fn close(&mut self) -> io::Result<()> {
        for line in ALL_CHANNELS {
            self.control.on_release(line.minor);
        }
        let elapsed = self.started_at.elapsed();
        self.record(elapsed, TranscriptRole::Emulator, &["session closed".to_string()])
    }

    fn handle_write(&self, target: &str, payload: &str) -> Vec<String> {
        let Some(minor) = resolve_minor(target) else {
            return vec![format!("ERR unknown command `{target}`; type `help`")];
        };

        let (consumed, status) = self.control.on_write(minor, payload.as_bytes());
        if status.is_ok() {
            vec![format!("OK {} accepted {consumed} bytes", label_for(minor))]
        } else {
            vec![format!("ERR {} {status}", label_for(minor))]
        }
    }

    fn handle_read(&self, target: &str) -> Vec<String> {
        let Some(minor) = resolve_minor(target) else {
            return vec![format!("ERR read expects a channel, got `{target}`")];
        };

        let (byte, status) = self.control.on_read(minor);
        if status.is_ok() {
            vec![format!(
                "{} = {byte} ({R_W_BUFF_LEN} byte)",
                label_for(minor)
            )]
        } else {
            vec![format!("ERR {} {status}", label_for(minor))]
        }
    }

    fn handle_fail(&self, rest: &str) -> Vec<String> {
        let (target, toggle) = split_word(rest);
        let Some(channel) = ChannelId::from_name(target) else {
            return vec![format!("ERR fail expects a channel, got `{target}`")];
        };
        let failing = match toggle {
            value if value.eq_ignore_ascii_case("on") => true,
            value if value.eq_ignore_ascii_case("off") => false,
            other => return vec![format!("ERR fail expects on|off, got `{other}`")],
        };

        self.control
            .controller()
            .driver()
            .set_failing(channel, failing);
        vec![format!(
            "OK {channel} fault {}",
            if failing { "injected" } else { "cleared" }
        )]
    }

    fn handle_status(&self) -> Vec<String> {
        let controller = self.control.controller();
        ALL_CHANNELS
            .iter()
            .map(|line| {
                let level = controller.driver().level(line.id);
                let free = controller.queues().remaining(line.id);
                describe_channel(line, level, free, &controller.snapshot(line.id))
            })
            .collect()
    }

    fn record(&mut self, elapsed: Duration, role: TranscriptRole, lines: &[String]) -> io::Result<()> {
        match self.transcript.as_mut() {
            Some(transcript) => lines
                .iter()
                .try_for_each(|line| transcript.append_line(elapsed, role, line)),
            None => Ok(()),
        }
    }
}

fn handle_help(topic: &str) -> Vec<String> {
    let mut lines = Vec::new();
    if topic.is_empty() {
        lines.push("Available commands:".to_string());
        for (_, detail) in HELP_TOPICS {
            lines.push(format!("  {detail}"));
        }
        lines.push("Type `help <topic>` for a specific command, `exit` to quit.".to_string());
    } else if let Some((_, detail)) = HELP_TOPICS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(topic))
    {
        lines.push((*detail).to_string());
    } else {
        lines.push(format!("No help available for `{topic}`."));
        lines.push(format!("Available topics: {}", help_topic_list()));
    }
    lines
}

fn describe_channel(
    line: &ChannelLine,
    level: Level,
    free: Option<usize>,
    snapshot: &ChannelSnapshot,
) -> String {
    let lamp = match (line.id, level) {
        (_, Level::Inactive) => "○".dark_grey(),
        (ChannelId::Red, Level::Active) => "●".red().bold(),
        (ChannelId::Blue, Level::Active) => "●".blue().bold(),
    };
    let pending = snapshot
        .pending
        .map_or_else(|| "-".to_string(), |command| command.to_string());
    let last = snapshot
        .last_outcome
        .map_or_else(|| "-".to_string(), |outcome| outcome.to_string());
    let free = free.map_or_else(|| "?".to_string(), |slots| slots.to_string());

    format!(
        "{lamp} {:<4} {} gpio{:<2} {} | pending: {pending} | last: {last} | queue: {free}/{CHANNEL_QUEUE_DEPTH} free | done={} failed={}{}",
        line.name,
        line.device_node,
        line.gpio,
        snapshot.activity,
        snapshot.completed,
        snapshot.failures,
        if snapshot.cancel_requested {
            " cancel-requested"
        } else {
            ""
        }
    )
}

/// Channel names map to their minor; bare numbers pass through unchecked so
/// unknown minors reach the control interface.
fn resolve_minor(target: &str) -> Option<u32> {
    ChannelId::from_name(target)
        .map(ChannelId::minor)
        .or_else(|| target.parse().ok())
}

fn label_for(minor: u32) -> String {
    ChannelId::from_minor(minor).map_or_else(|| format!("minor {minor}"), |id| id.to_string())
}

fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (input, ""),
    }
}

fn help_topic_list() -> String {
    HELP_TOPICS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };
        writeln!(logger.writer, "# LED emulator transcript")?;
        writeln!(logger.writer, "# Timestamps are milliseconds since session start")?;
        writeln!(logger.writer)?;
        logger.writer.flush()?;
        Ok(logger)
    }

    fn append_line(&mut self, elapsed: Duration, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

#[derive(Clone, Copy)]
enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}
