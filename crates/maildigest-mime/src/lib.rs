//! # maildigest-mime
//!
//! Permissive MIME message parsing for the digest pipeline.
//!
//! ## Features
//!
//! - **Message parsing**: Parse MIME messages with nested multipart support
//! - **Permissive decoding**: Base64, Quoted-Printable, and RFC 2047
//!   encoded-word decoding that degrades to best-effort output instead of
//!   failing on malformed input
//! - **Content types**: Content-Type and Content-Disposition parameters
//!
//! Messages pulled from a live mailbox are frequently sloppy: mixed or
//! missing charsets in headers, stray bytes in bodies, boundary quirks.
//! This crate therefore separates the two failure modes:
//!
//! - structural parsing (finding the header block, walking multipart
//!   boundaries) returns [`Result`], and
//! - content decoding (transfer encodings, encoded words, charsets) never
//!   fails: invalid input is replaced or passed through as-is.
//!
//! ## Quick Start
//!
//! ```ignore
//! use maildigest_mime::Message;
//!
//! let message = Message::parse(raw_bytes)?;
//! println!("Subject: {}", message.subject());
//! for part in &message.parts {
//!     println!("part: {}", part.content_type().essence());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use content_type::{ContentDisposition, ContentType};
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Message, Part, TransferEncoding};
