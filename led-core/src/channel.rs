//! Channel catalog shared by the driver and host tooling.
//!
//! Each channel is one binary output with its own command state. The catalog
//! is fixed at compile time; nothing in the controller adds or removes
//! channels while it runs.

use core::fmt;

/// Number of independently controlled channels.
pub const CHANNEL_COUNT: usize = 2;

/// Identifier for the LED channels exposed by the controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ChannelId {
    Red,
    Blue,
}

impl ChannelId {
    /// Deterministic index for lookups into [`ALL_CHANNELS`].
    pub const fn as_index(self) -> usize {
        match self {
            ChannelId::Red => 0,
            ChannelId::Blue => 1,
        }
    }

    /// Attempts to construct a [`ChannelId`] from a raw index.
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(ChannelId::Red),
            1 => Some(ChannelId::Blue),
            _ => None,
        }
    }

    /// Resolves the device minor number used by the control interface.
    pub const fn from_minor(minor: u32) -> Option<Self> {
        let mut index = 0;
        while index < CHANNEL_COUNT {
            if ALL_CHANNELS[index].minor == minor {
                return Some(ALL_CHANNELS[index].id);
            }
            index += 1;
        }
        None
    }

    /// Case-insensitive lookup by catalog name (`red`, `blue`).
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_CHANNELS
            .iter()
            .find(|line| line.name.eq_ignore_ascii_case(name))
            .map(|line| line.id)
    }

    /// Returns the catalog name of the channel.
    pub const fn name(self) -> &'static str {
        channel_by_id(self).name
    }

    /// Returns the device minor number of the channel.
    pub const fn minor(self) -> u32 {
        channel_by_id(self).minor
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Binary output level of a channel.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum Level {
    #[default]
    Inactive,
    Active,
}

impl Level {
    /// Single-byte encoding returned by the read path (`0` or `1`).
    pub const fn as_byte(self) -> u8 {
        match self {
            Level::Inactive => 0,
            Level::Active => 1,
        }
    }

    /// Returns `true` for [`Level::Active`].
    pub const fn is_active(self) -> bool {
        matches!(self, Level::Active)
    }
}

impl From<bool> for Level {
    fn from(value: bool) -> Self {
        if value { Level::Active } else { Level::Inactive }
    }
}

impl From<Level> for bool {
    fn from(value: Level) -> Self {
        value.is_active()
    }
}

/// Metadata describing how a channel is wired and exposed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ChannelLine {
    pub id: ChannelId,
    pub name: &'static str,
    /// Device minor number selecting this channel on the control interface.
    pub minor: u32,
    /// GPIO number driving the LED on the reference board.
    pub gpio: u8,
    pub device_node: &'static str,
}

impl ChannelLine {
    pub const fn new(
        id: ChannelId,
        name: &'static str,
        minor: u32,
        gpio: u8,
        device_node: &'static str,
    ) -> Self {
        Self {
            id,
            name,
            minor,
            gpio,
            device_node,
        }
    }
}

/// Compile-time catalog of every channel.
pub const ALL_CHANNELS: [ChannelLine; CHANNEL_COUNT] = [
    ChannelLine::new(ChannelId::Red, "red", 0, 16, "LED_CTRL0"),
    ChannelLine::new(ChannelId::Blue, "blue", 1, 20, "LED_CTRL1"),
];

/// Retrieve channel metadata by identifier.
pub const fn channel_by_id(id: ChannelId) -> ChannelLine {
    ALL_CHANNELS[id.as_index()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_indices_match_identifiers() {
        for (index, line) in ALL_CHANNELS.iter().enumerate() {
            assert_eq!(line.id.as_index(), index);
            assert_eq!(ChannelId::from_index(index), Some(line.id));
        }
        assert_eq!(ChannelId::from_index(CHANNEL_COUNT), None);
    }

    #[test]
    fn minors_resolve_to_channels() {
        assert_eq!(ChannelId::from_minor(0), Some(ChannelId::Red));
        assert_eq!(ChannelId::from_minor(1), Some(ChannelId::Blue));
        assert_eq!(ChannelId::from_minor(2), None);
    }

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(ChannelId::from_name("RED"), Some(ChannelId::Red));
        assert_eq!(ChannelId::from_name("Blue"), Some(ChannelId::Blue));
        assert_eq!(ChannelId::from_name("green"), None);
    }

    #[test]
    fn level_byte_encoding() {
        assert_eq!(Level::from(true).as_byte(), 1);
        assert_eq!(Level::from(false).as_byte(), 0);
        assert!(bool::from(Level::Active));
    }
}
