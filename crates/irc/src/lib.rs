//! IRC implementation of [`fez_channels::Transport`].
//!
//! TLS via rustls with the platform root store, CRLF framing through a
//! tokio-util codec, registration with `PASS` or SASL PLAIN, and translation
//! of server lines into [`fez_channels::Signal`]s.

pub mod codec;
pub mod config;
pub mod connection;
pub mod message;
mod protocol;

pub use {
    codec::IrcCodec,
    config::IrcConfig,
    connection::{BoxedStream, IoStream, IrcTransport},
    message::{Message, Prefix},
};
