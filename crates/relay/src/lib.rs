//! The relay: feed events in, formatted channel messages out.
//!
//! Each event passes the staleness guard, then the rules, then the
//! formatter and a length check before it is sent. Between feed items the
//! loop services the transport, dispatching signals through the handler
//! table built by [`relay_handlers`].

pub mod commands;
pub mod format;
pub mod handlers;
pub mod relay;
pub mod staleness;

pub use {
    commands::CommandConfig,
    format::{MAX_MESSAGE_BYTES, format_event, strip_formatting},
    handlers::{CLOAK_ERROR_MSG, relay_handlers},
    relay::{Clock, ExitReason, Relay, RelaySettings, RelayState, RelayStats, SystemClock},
    staleness::{Freshness, StalenessGuard, is_fresh},
};
