//! # Bearer Relay Library
//!
//! Client-side HTTP access layer that authenticates every outbound call with
//! a bearer token and recovers from token expiry with a single refresh,
//! replaying the calls that failed while it was in flight.
//!
//! Modules:
//! - `config`: YAML configuration, defaults and validation
//! - `store`: token pair persistence (file, memory, no-op)
//! - `events`: auth lifecycle event bus
//! - `transport`: authenticating transport and the bare refresh call
//! - `coordinator`: single-flight refresh and FIFO replay
//! - `session`: login / logout paths

pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod helpers;
pub mod observability;
pub mod parser;
pub mod relay;
pub mod session;
pub mod store;
pub mod transport;
pub mod utils;

#[cfg(test)]
pub mod tests;

pub use crate::config::client::*;
pub use crate::error::{AuthError, RefreshFailure, RefreshFailureKind};
pub use crate::events::{AuthEvent, AuthEventBus, Subscription};
pub use crate::relay::Relay;
pub use crate::store::{TokenPair, TokenStore};
pub use crate::transport::{AuthenticatingTransport, RequestDescriptor, Response};
