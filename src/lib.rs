//! chirp - Chat server client with transparent session management.
//!
//! This library provides the client-side authentication core for a chat
//! server: a durable session store, single-flight access token refresh, an
//! authenticated request wrapper that recovers from 401s transparently, and
//! cached server-side session verification. All authenticated operations
//! flow through a [`Client`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chirp::{Client, Credentials, ServerUrl};
//! use chirp::storage::FileStorage;
//!
//! # async fn example() -> Result<(), chirp::Error> {
//! let server = ServerUrl::new("https://chat.example.com")?;
//! let storage = Arc::new(FileStorage::in_dir("/home/alice/.config/chirp"));
//! let client = Client::new(server, storage);
//!
//! if !client.restore().await {
//!     client.login(Credentials::new("alice", "app-password")).await?;
//! }
//!
//! let channel = client.channel("42").await?;
//! println!("{} messages in #{}", channel.messages.len(), channel.name);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
mod client;
mod config;
pub mod error;
pub mod storage;
pub mod types;

// Re-export primary types at crate root for convenience
pub use api::{Account, Channel, Message, NewAccount, NewMessage};
pub use auth::{Credentials, SessionStore, Verification, VerificationStatus};
pub use client::Client;
pub use config::ClientConfig;
pub use error::Error;
pub use types::{ServerUrl, User};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
