//! Mailbox service: connect, search, and fetch raw messages.
//!
//! Transport failures follow the run-level error taxonomy: connect and
//! authentication failures abort the run, while search and per-message
//! fetch failures are soft (logged and skipped).

use chrono::NaiveDate;
use maildigest_imap::{Client, Config, connect_tls};
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::Result;

/// One fetched message, still raw bytes.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Mailbox-assigned UID.
    pub uid: u32,
    /// Full RFC 822 bytes.
    pub bytes: Vec<u8>,
}

/// Formats a date for an IMAP SINCE criterion (`08-Aug-2026`).
#[must_use]
pub fn imap_date(date: NaiveDate) -> String {
    date.format("%d-%b-%Y").to_string()
}

/// Connects to the configured mailbox and fetches all messages from
/// `sender` since `since`, in the order the search returns them.
///
/// # Errors
///
/// Returns an error for connection or authentication failures. Search and
/// fetch failures degrade to fewer messages.
pub async fn fetch_messages(
    settings: &Settings,
    sender: &str,
    since: NaiveDate,
) -> Result<Vec<RawMessage>> {
    let config = Config::new(settings.host.clone());
    let stream = connect_tls(&config).await?;
    let client = Client::from_stream(stream).await?;
    let mut session = client.login(&settings.user, &settings.password).await?;
    session.select("INBOX").await?;
    info!(host = %settings.host, "connected to mailbox");

    let uids = match session.search_from_since(sender, &imap_date(since)).await {
        Ok(uids) => uids,
        Err(e) => {
            warn!(error = %e, "search failed");
            Vec::new()
        }
    };
    info!(sender, count = uids.len(), "messages found");

    let mut messages = Vec::with_capacity(uids.len());
    for uid in uids {
        match session.fetch_raw(uid).await {
            Ok(bytes) => messages.push(RawMessage { uid, bytes }),
            Err(e) => warn!(uid, error = %e, "fetch failed, skipping message"),
        }
    }

    if let Err(e) = session.logout().await {
        warn!(error = %e, "logout failed");
    }

    Ok(messages)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_imap_date_format() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 8).unwrap();
        assert_eq!(imap_date(date), "08-Aug-2026");

        let date = NaiveDate::from_ymd_opt(2026, 12, 25).unwrap();
        assert_eq!(imap_date(date), "25-Dec-2026");
    }
}
