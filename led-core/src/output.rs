//! Abstraction over the physical channel outputs.

use crate::channel::{ChannelId, Level};

/// Hardware capability that sets and samples a channel's binary output.
///
/// Methods take `&self` so a single driver can be shared between channel
/// workers and the read path; implementations provide whatever interior
/// synchronization their hardware needs. Calls are synchronous and are not
/// retried by the controller.
pub trait OutputDriver {
    /// Hardware-specific failure.
    type Error: core::fmt::Debug;

    /// Drives the channel output to `level`.
    fn set_output(&self, channel: ChannelId, level: Level) -> Result<(), Self::Error>;

    /// Samples the current output level of the channel.
    fn get_output(&self, channel: ChannelId) -> Result<Level, Self::Error>;
}

impl<T: OutputDriver + ?Sized> OutputDriver for &T {
    type Error = T::Error;

    fn set_output(&self, channel: ChannelId, level: Level) -> Result<(), Self::Error> {
        (**self).set_output(channel, level)
    }

    fn get_output(&self, channel: ChannelId) -> Result<Level, Self::Error> {
        (**self).get_output(channel)
    }
}
