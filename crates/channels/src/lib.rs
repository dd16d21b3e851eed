//! Chat transport abstraction.
//!
//! A transport turns inbound protocol traffic into [`Signal`]s and performs
//! [`Action`]s. Signals are routed through a [`HandlerTable`]; handlers see
//! the mutable [`Session`] and answer with actions. Everything runs on one
//! execution context.

pub mod error;
pub mod handlers;
pub mod session;
pub mod signal;
pub mod transport;

pub use {
    error::{Error, Result},
    handlers::{Handler, HandlerTable},
    session::{ConnectionState, Identity, Session, ShutdownReason},
    signal::{Action, Signal, SignalKind, Source},
    transport::Transport,
};
