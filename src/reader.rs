//! Receiving GELF messages from a datagram transport.

use std::io;
use std::net::UdpSocket;
use std::sync::{Mutex, PoisonError};

use crate::chunk::{ChunkHeader, ChunkSet};
use crate::compression::decompress;
use crate::{Config, Error, Message};

/// A connectionless, message oriented endpoint which datagrams are read
/// from.
pub trait Transport {
    /// Receive one datagram into `buf`, blocking until one arrives.
    ///
    /// Datagrams longer than `buf` may be truncated.
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// The local address the transport is bound to.
    fn local_addr(&self) -> io::Result<String>;
}

impl Transport for UdpSocket {
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.recv_from(buf).map(|(n, _)| n)
    }

    fn local_addr(&self) -> io::Result<String> {
        UdpSocket::local_addr(self).map(|addr| addr.to_string())
    }
}

/// Decode a complete, reassembled payload into a message.
pub fn decode(buf: &[u8], max_message_size: usize) -> Result<Message, Error> {
    let payload = decompress(buf, max_message_size)?;
    Message::from_slice(&payload)
}

/// Reads GELF messages from a [`Transport`].
///
/// Only one chunked message is assembled at a time. Concurrent calls on the
/// same reader are serialized, each one holds an internal lock until its
/// message is complete.
#[derive(Debug)]
pub struct Reader<T = UdpSocket> {
    conn: T,
    config: Config,
    buf: Mutex<Vec<u8>>,
}

impl Reader<UdpSocket> {
    /// Bind a UDP socket at `addr` with the default config.
    pub fn bind(addr: &str) -> Result<Self, Error> {
        Self::bind_with_config(addr, Config::default())
    }

    pub fn bind_with_config(addr: &str, config: Config) -> Result<Self, Error> {
        let bind_err = |source| Error::Bind {
            addr: addr.to_string(),
            source,
        };

        let conn = UdpSocket::bind(addr).map_err(bind_err)?;
        conn.set_read_timeout(config.read_timeout).map_err(bind_err)?;

        tracing::debug!(addr, "gelf reader bound");

        Ok(Reader::new(conn, config))
    }
}

impl<T: Transport> Reader<T> {
    pub fn new(conn: T, config: Config) -> Self {
        let buf = Mutex::new(vec![0u8; config.chunk_size]);

        Reader { conn, config, buf }
    }

    /// Local address of the underlying transport.
    pub fn addr(&self) -> io::Result<String> {
        self.conn.local_addr()
    }

    #[inline]
    pub fn get_ref(&self) -> &T {
        &self.conn
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_inner(self) -> T {
        self.conn
    }

    /// Receive and decode the next message.
    ///
    /// Any error only affects the message being read, the next call starts
    /// over with a fresh datagram.
    pub fn read_message(&self) -> Result<Message, Error> {
        let raw = self.read_raw()?;
        decode(&raw, self.config.max_message_size)
    }

    /// Receive the next message and return its decompressed payload, without
    /// decoding the JSON.
    pub fn read_payload(&self) -> Result<Vec<u8>, Error> {
        let raw = self.read_raw()?;
        decompress(&raw, self.config.max_message_size).map(|payload| payload.into_owned())
    }

    /// Receive datagrams until one message is complete, and return it as
    /// sent, compressed or not.
    fn read_raw(&self) -> Result<Vec<u8>, Error> {
        let mut buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        let mut set: Option<ChunkSet> = None;

        for _ in 0..self.config.max_receives.max(1) {
            let n = self.conn.recv(&mut buf).map_err(Error::Io)?;
            let datagram = &buf[..n];

            let (header, payload) = match ChunkHeader::parse(datagram) {
                Some(chunk) => chunk.inspect_err(|err| {
                    tracing::warn!(error = %err, "dropping malformed chunk");
                })?,
                None => {
                    if let Some(set) = &set {
                        tracing::warn!(
                            message_id = ?set.message_id(),
                            received = set.received(),
                            total = set.total(),
                            "unchunked datagram while assembling"
                        );
                        return Err(Error::NotChunked);
                    }

                    return Ok(datagram.to_vec());
                }
            };

            let chunks = set.get_or_insert_with(|| ChunkSet::new(&header));
            chunks.insert(&header, payload).inspect_err(|err| {
                tracing::warn!(error = %err, "dropping message");
            })?;

            tracing::trace!(
                message_id = ?header.message_id,
                sequence = header.sequence,
                total = header.total,
                len = payload.len(),
                "chunk received"
            );

            if chunks.is_complete() {
                break;
            }
        }

        // unchunked datagrams return from the loop, so a set exists here
        let Some(set) = set else {
            return Err(Error::InvalidChunk("no chunk received"));
        };

        if !set.is_complete() {
            tracing::warn!(
                message_id = ?set.message_id(),
                received = set.received(),
                total = set.total(),
                "receive limit reached before all chunks arrived"
            );

            if !self.config.allow_incomplete {
                return Err(Error::Incomplete {
                    received: set.received(),
                    total: set.total(),
                });
            }
        }

        tracing::debug!(
            message_id = ?set.message_id(),
            chunks = set.total(),
            len = set.len(),
            "chunked message assembled"
        );

        Ok(set.assemble())
    }
}

/// Reads the next message and copies its text (see [`Message::body`]) into
/// `buf`.
///
/// Text longer than `buf` is cut off and the rest of it is lost. A message
/// with no text reads as zero bytes.
impl<T: Transport> io::Read for &Reader<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let msg = self.read_message()?;
        let body = msg.body().as_bytes();
        let n = body.len().min(buf.len());
        buf[..n].copy_from_slice(&body[..n]);

        Ok(n)
    }
}

impl<T: Transport> io::Read for Reader<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut &*self, buf)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;
    use crate::chunk::MAGIC_CHUNKED;

    struct Datagrams(RefCell<VecDeque<Vec<u8>>>);

    impl Transport for Datagrams {
        fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
            let datagram = self
                .0
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| io::Error::from(io::ErrorKind::WouldBlock))?;
            let n = datagram.len().min(buf.len());
            buf[..n].copy_from_slice(&datagram[..n]);
            Ok(n)
        }

        fn local_addr(&self) -> io::Result<String> {
            Ok("memory".to_string())
        }
    }

    fn reader(datagrams: Vec<Vec<u8>>, config: Config) -> Reader<Datagrams> {
        Reader::new(Datagrams(RefCell::new(datagrams.into())), config)
    }

    fn chunk(id: u8, seq: u8, total: u8, payload: &[u8]) -> Vec<u8> {
        let mut buf = MAGIC_CHUNKED.to_vec();
        buf.extend_from_slice(&[id; 8]);
        buf.extend_from_slice(&[seq, total]);
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn unchunked_stops_after_one_datagram() {
        let r = reader(
            vec![
                br#"{"short_message":"one"}"#.to_vec(),
                br#"{"short_message":"two"}"#.to_vec(),
            ],
            Config::default(),
        );

        assert_eq!(r.read_message().unwrap().short, "one");
        assert_eq!(r.read_message().unwrap().short, "two");
        assert!(matches!(r.read_message(), Err(Error::Io(_))));
    }

    #[test]
    fn chunked() {
        let r = reader(
            vec![
                chunk(1, 1, 3, br#"message":"#),
                chunk(1, 2, 3, br#""chunked"}"#),
                chunk(1, 0, 3, br#"{"short_"#),
            ],
            Config::default(),
        );

        assert_eq!(r.read_message().unwrap().short, "chunked");
    }

    #[test]
    fn unchunked_while_assembling() {
        let r = reader(
            vec![chunk(1, 0, 2, b"{"), br#"{"short_message":"x"}"#.to_vec()],
            Config::default(),
        );

        assert!(matches!(r.read_message(), Err(Error::NotChunked)));
    }

    #[test]
    fn receive_limit() {
        let config = Config {
            max_receives: 2,
            ..Default::default()
        };
        let r = reader(
            vec![
                chunk(1, 0, 3, br#"{"short_message":"#),
                chunk(1, 0, 3, br#"{"short_message":"#),
                chunk(1, 1, 3, br#""late"}"#),
            ],
            config,
        );

        assert!(matches!(
            r.read_payload(),
            Err(Error::Incomplete {
                received: 1,
                total: 3
            })
        ));
    }

    #[test]
    fn zero_receive_limit() {
        let config = Config {
            max_receives: 0,
            ..Default::default()
        };
        let r = reader(
            vec![
                br#"{"short_message":"one"}"#.to_vec(),
                chunk(1, 0, 1, br#"{"short_message":"two"}"#),
            ],
            config,
        );

        assert_eq!(r.read_message().unwrap().short, "one");
        assert_eq!(r.read_message().unwrap().short, "two");
    }

    #[test]
    fn allow_incomplete() {
        let config = Config {
            max_receives: 2,
            allow_incomplete: true,
            ..Default::default()
        };
        let r = reader(
            vec![chunk(1, 0, 3, b"{\"short_"), chunk(1, 2, 3, b"}")],
            config,
        );

        assert_eq!(r.read_payload().unwrap(), b"{\"short_}");
    }

    #[test]
    fn legacy_read_truncates() {
        let mut r = reader(
            vec![br#"{"short_message":"short","full_message":"a much longer text"}"#.to_vec()],
            Config::default(),
        );

        let mut buf = [0u8; 6];
        let n = io::Read::read(&mut r, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"a much");
    }

    #[test]
    fn legacy_read_error() {
        let mut r = reader(vec![b"not json".to_vec()], Config::default());

        let err = io::Read::read(&mut r, &mut [0u8; 16]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
