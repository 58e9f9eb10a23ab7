//! # maildigest-imap
//!
//! A thin IMAP client for the digest pipeline.
//!
//! The pipeline only needs three mailbox operations, and this crate exposes
//! exactly those:
//!
//! - connect + authenticate (implicit TLS, LOGIN)
//! - search for messages from one sender since a date
//! - fetch a message's full raw bytes
//!
//! ## Quick Start
//!
//! ```ignore
//! use maildigest_imap::{Client, Config, connect_tls};
//!
//! let config = Config::new("imap.example.com");
//! let stream = connect_tls(&config).await?;
//! let client = Client::from_stream(stream).await?;
//!
//! let mut session = client.login("user@example.com", "password").await?;
//! session.select("INBOX").await?;
//!
//! let uids = session
//!     .search_from_since("advisor@example.com", "8-Aug-2026")
//!     .await?;
//! for uid in uids {
//!     let raw = session.fetch_raw(uid).await?;
//!     // hand off to the MIME layer
//! }
//!
//! session.logout().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod config;
mod error;
mod stream;

pub use client::{Client, Session};
pub use config::Config;
pub use error::{Error, Result};
pub use stream::connect_tls;
