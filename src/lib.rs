//! Reader for [GELF](https://go2docs.graylog.org/current/getting_in_log_data/gelf.html)
//! (Graylog Extended Log Format) messages received over UDP.
//!
//! Handles chunked messages, gzip and zlib compressed payloads, and maps the
//! JSON document onto a [`Message`]. Additional fields (those prefixed with an
//! underscore) end up in [`Message::extra`].
//!
//! # Example
//!
//! A simple GELF server
//!
//! ```no_run
//! use gelf::Reader;
//!
//! let reader = Reader::bind("127.0.0.1:12201").unwrap();
//! loop {
//!     match reader.read_message() {
//!         Ok(msg) => println!("{} {:?} {}", msg.host, msg.severity(), msg.body()),
//!         Err(err) if err.is_transport() => break,
//!         Err(err) => eprintln!("dropping message: {err}"),
//!     }
//! }
//! ```
//!
//! # Unimplemented Features
//!
//!  * Only one chunked message is assembled at a time. Chunks of two messages
//!    interleaving on the same socket fail the message being assembled.
//!  * GELF over TCP, and sending messages.
//!

pub mod chunk;
pub mod compression;
mod config;
mod error;
mod mapper;
mod message;
mod reader;
mod severity;

pub use compression::Compression;
pub use config::Config;
pub use error::Error;
pub use message::Message;
pub use reader::{decode, Reader, Transport};
pub use severity::Severity;
