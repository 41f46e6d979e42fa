use std::time::Duration;

use serde::Deserialize;

use crate::chunk::MAX_CHUNKS;

/// Maximum chunk size allowed by the GELF protocol.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

pub const DEFAULT_MAX_RECEIVES: usize = MAX_CHUNKS;

pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 32 * 1024 * 1024;

/// Tuning knobs of a [`Reader`](crate::Reader).
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Size of the receive buffer, datagrams longer than this are truncated
    /// by the transport.
    pub chunk_size: usize,

    /// Upper bound of datagrams received while assembling one message. Zero
    /// counts as one, every read receives at least one datagram.
    pub max_receives: usize,

    /// Read timeout applied to sockets bound by the reader. `None` blocks
    /// until a datagram arrives.
    pub read_timeout: Option<Duration>,

    /// Upper bound of a decompressed payload.
    pub max_message_size: usize,

    /// Decode whatever chunks arrived when `max_receives` is exhausted,
    /// instead of failing with [`Error::Incomplete`](crate::Error::Incomplete).
    pub allow_incomplete: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_receives: DEFAULT_MAX_RECEIVES,
            read_timeout: None,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            allow_incomplete: false,
        }
    }
}
