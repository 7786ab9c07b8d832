//! HTTP API layer.
//!
//! This module provides the transport client, the authenticated request
//! wrapper, and the wire types for the chat server's endpoints.

pub(crate) mod endpoints;
mod http;

pub use endpoints::{Account, Channel, Message, NewAccount, NewMessage};
pub(crate) use http::{AuthedClient, HttpClient, parse_error_response};
