//! Chunked GELF datagrams.
//!
//! A message too large for one datagram is split by the sender into up to
//! 128 chunks, each prefixed with a 12 byte header:
//!
//! ```text
//! +------------+----------------+----------+-------+----------------+
//! | magic (2)  | message id (8) | seq (1)  | total | payload ...    |
//! | 0x1e 0x0f  | opaque         | 0..total | (1)   |                |
//! +------------+----------------+----------+-------+----------------+
//! ```

use crate::Error;

/// Leading bytes of every chunked datagram.
pub const MAGIC_CHUNKED: [u8; 2] = [0x1e, 0x0f];

/// Maximum number of chunks a message may be split into.
pub const MAX_CHUNKS: usize = 128;

/// Length of the chunk header, magic included.
pub const CHUNKED_HEADER_LEN: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkHeader {
    pub message_id: [u8; 8],
    pub sequence: u8,
    pub total: u8,
}

impl ChunkHeader {
    /// Split a datagram into its chunk header and payload.
    ///
    /// Returns `None` if the datagram does not start with the chunked magic,
    /// i.e. it is a complete message on its own.
    pub fn parse(buf: &[u8]) -> Option<Result<(ChunkHeader, &[u8]), Error>> {
        if buf.len() < 2 || buf[..2] != MAGIC_CHUNKED {
            return None;
        }

        Some(Self::parse_chunked(buf))
    }

    fn parse_chunked(buf: &[u8]) -> Result<(ChunkHeader, &[u8]), Error> {
        if buf.len() < CHUNKED_HEADER_LEN {
            return Err(Error::InvalidChunk("datagram shorter than chunk header"));
        }

        let mut message_id = [0u8; 8];
        message_id.copy_from_slice(&buf[2..10]);
        let sequence = buf[10];
        let total = buf[11];

        if total == 0 {
            return Err(Error::InvalidChunk("zero total chunks"));
        }
        if sequence >= total {
            return Err(Error::InvalidChunk("sequence number out of range"));
        }

        let header = ChunkHeader {
            message_id,
            sequence,
            total,
        };

        Ok((header, &buf[CHUNKED_HEADER_LEN..]))
    }
}

/// Reassembly state for a single multi-chunk message.
#[derive(Debug)]
pub struct ChunkSet {
    message_id: [u8; 8],
    chunks: Vec<Option<Vec<u8>>>,
    length: usize,
}

impl ChunkSet {
    pub fn new(header: &ChunkHeader) -> Self {
        ChunkSet {
            message_id: header.message_id,
            chunks: vec![None; header.total as usize],
            length: 0,
        }
    }

    #[inline]
    pub fn message_id(&self) -> &[u8; 8] {
        &self.message_id
    }

    /// Declared number of chunks.
    #[inline]
    pub fn total(&self) -> usize {
        self.chunks.len()
    }

    /// Number of distinct sequence indices stored so far.
    pub fn received(&self) -> usize {
        self.chunks.iter().filter(|c| c.is_some()).count()
    }

    /// Accumulated payload length across stored chunks.
    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn is_complete(&self) -> bool {
        self.chunks.iter().all(Option::is_some)
    }

    /// Store a chunk payload. A repeated sequence index replaces the
    /// earlier payload.
    ///
    /// Chunks whose message id differs from the set's are rejected, only one
    /// message is assembled at a time.
    pub fn insert(&mut self, header: &ChunkHeader, payload: &[u8]) -> Result<(), Error> {
        if header.message_id != self.message_id {
            return Err(Error::OutOfBand {
                got: header.message_id,
                awaited: self.message_id,
            });
        }

        // the total of the first chunk wins, later headers can't grow the set
        let slot = self
            .chunks
            .get_mut(header.sequence as usize)
            .ok_or(Error::InvalidChunk("sequence number out of range"))?;

        if let Some(previous) = slot.replace(payload.to_vec()) {
            self.length -= previous.len();
        }
        self.length += payload.len();

        Ok(())
    }

    /// Concatenate the stored payloads in sequence order. Missing indices
    /// are skipped.
    pub fn assemble(self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.length);
        for chunk in self.chunks.into_iter().flatten() {
            buf.extend_from_slice(&chunk);
        }

        buf
    }
}
