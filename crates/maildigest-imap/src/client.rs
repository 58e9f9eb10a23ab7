//! Thin tagged-command IMAP client.
//!
//! Exposes exactly the operations the digest pipeline consumes: LOGIN,
//! SELECT, `UID SEARCH FROM/SINCE`, `UID FETCH RFC822`, and LOGOUT. The
//! authentication state is tracked by type: [`Client`] can only log in,
//! [`Session`] can only run mailbox commands.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::{Error, Result};

/// Generates unique command tags (A0001, A0002, ...).
#[derive(Debug, Default)]
struct TagGenerator {
    counter: u32,
}

impl TagGenerator {
    fn next(&mut self) -> String {
        self.counter += 1;
        format!("A{:04}", self.counter)
    }
}

/// Line-oriented reader/writer over the raw stream, with support for IMAP
/// literals (`{n}` byte counts).
struct LineStream<S> {
    stream: S,
    buffer: BytesMut,
}

impl<S> LineStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(8192),
        }
    }

    /// Reads one CRLF-terminated line, without the line ending.
    async fn read_line(&mut self) -> Result<String> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let line = self.buffer.split_to(pos + 1);
                let text = String::from_utf8_lossy(&line)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                trace!(line = %text, "S:");
                return Ok(text);
            }

            let read = self.stream.read_buf(&mut self.buffer).await?;
            if read == 0 {
                return Err(Error::Protocol("connection closed by server".to_string()));
            }
        }
    }

    /// Reads exactly `len` bytes (an IMAP literal).
    async fn read_exact(&mut self, len: usize) -> Result<Vec<u8>> {
        while self.buffer.len() < len {
            let read = self.stream.read_buf(&mut self.buffer).await?;
            if read == 0 {
                return Err(Error::Protocol(
                    "connection closed inside literal".to_string(),
                ));
            }
        }
        Ok(self.buffer.split_to(len).to_vec())
    }

    async fn write_command(&mut self, command: &str) -> Result<()> {
        trace!(command, "C:");
        self.stream.write_all(command.as_bytes()).await?;
        self.stream.write_all(b"\r\n").await?;
        self.stream.flush().await?;
        Ok(())
    }
}

/// An unauthenticated IMAP connection.
pub struct Client<S> {
    stream: LineStream<S>,
    tag_gen: TagGenerator,
}

impl<S> std::fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a connected stream and consumes the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the server greets with BYE or the greeting is
    /// not an untagged response.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut stream = LineStream::new(stream);
        let greeting = stream.read_line().await?;

        if greeting.starts_with("* BYE") {
            return Err(Error::Bye(greeting));
        }
        if !greeting.starts_with('*') {
            return Err(Error::Protocol(format!("unexpected greeting: {greeting}")));
        }

        debug!("connected, server greeting received");
        Ok(Self {
            stream,
            tag_gen: TagGenerator::default(),
        })
    }

    /// Authenticates with LOGIN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] when the server rejects the credentials;
    /// other errors indicate transport or protocol failures.
    pub async fn login(mut self, username: &str, password: &str) -> Result<Session<S>> {
        let command = format!(
            "LOGIN {} {}",
            quote_string(username),
            quote_string(password)
        );

        match run_command(&mut self.stream, &mut self.tag_gen, &command).await {
            Ok(_) => {
                debug!(username, "authenticated");
                Ok(Session {
                    stream: self.stream,
                    tag_gen: self.tag_gen,
                })
            }
            Err(Error::No(text)) => Err(Error::Auth(text)),
            Err(e) => Err(e),
        }
    }
}

/// An authenticated IMAP session.
pub struct Session<S> {
    stream: LineStream<S>,
    tag_gen: TagGenerator,
}

impl<S> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Selects a mailbox and returns its message count (EXISTS).
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the SELECT.
    pub async fn select(&mut self, mailbox: &str) -> Result<u32> {
        let command = format!("SELECT {}", quote_string(mailbox));
        let untagged = run_command(&mut self.stream, &mut self.tag_gen, &command).await?;

        let exists = untagged
            .iter()
            .find_map(|line| {
                let mut tokens = line.split_whitespace();
                let star = tokens.next()?;
                let count = tokens.next()?;
                let word = tokens.next()?;
                (star == "*" && word.eq_ignore_ascii_case("EXISTS"))
                    .then(|| count.parse::<u32>().ok())
                    .flatten()
            })
            .unwrap_or(0);

        debug!(mailbox, exists, "mailbox selected");
        Ok(exists)
    }

    /// Searches for messages from a sender since a date.
    ///
    /// `since` is an IMAP date string (`8-Aug-2026`). Returns matching UIDs
    /// in the order the server reports them.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the SEARCH.
    pub async fn search_from_since(&mut self, sender: &str, since: &str) -> Result<Vec<u32>> {
        let command = format!("UID SEARCH FROM {} SINCE {since}", quote_string(sender));
        let untagged = run_command(&mut self.stream, &mut self.tag_gen, &command).await?;

        let mut uids = Vec::new();
        for line in &untagged {
            let mut tokens = line.split_whitespace();
            if tokens.next() == Some("*")
                && tokens
                    .next()
                    .is_some_and(|t| t.eq_ignore_ascii_case("SEARCH"))
            {
                uids.extend(tokens.filter_map(|t| t.parse::<u32>().ok()));
            }
        }

        debug!(sender, since, found = uids.len(), "search complete");
        Ok(uids)
    }

    /// Fetches the full raw message (RFC 822) for one UID.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the FETCH or returns no
    /// message literal.
    pub async fn fetch_raw(&mut self, uid: u32) -> Result<Vec<u8>> {
        let tag = self.tag_gen.next();
        self.stream
            .write_command(&format!("{tag} UID FETCH {uid} (RFC822)"))
            .await?;

        let mut data: Option<Vec<u8>> = None;
        loop {
            let line = self.stream.read_line().await?;

            if let Some(rest) = line.strip_prefix(&format!("{tag} ")) {
                check_completion(rest)?;
                break;
            }

            if line.starts_with('*') {
                if let Some(len) = literal_length(&line) {
                    data = Some(self.stream.read_exact(len).await?);
                }
            }
        }

        data.ok_or_else(|| Error::Protocol(format!("no message data for UID {uid}")))
    }

    /// Logs out and consumes the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the LOGOUT.
    pub async fn logout(mut self) -> Result<()> {
        run_command(&mut self.stream, &mut self.tag_gen, "LOGOUT").await?;
        Ok(())
    }
}

/// Sends one command and reads until its tagged completion.
///
/// Returns the untagged response lines. BYE lines terminate the session.
async fn run_command<S>(
    stream: &mut LineStream<S>,
    tag_gen: &mut TagGenerator,
    command: &str,
) -> Result<Vec<String>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let tag = tag_gen.next();
    stream.write_command(&format!("{tag} {command}")).await?;

    let mut untagged = Vec::new();
    loop {
        let line = stream.read_line().await?;

        if let Some(rest) = line.strip_prefix(&format!("{tag} ")) {
            check_completion(rest)?;
            return Ok(untagged);
        }

        // LOGOUT elicits "* BYE" before the tagged OK; that is not an error
        if line.starts_with("* BYE") && !command.eq_ignore_ascii_case("LOGOUT") {
            return Err(Error::Bye(line));
        }

        untagged.push(line);
    }
}

/// Checks a tagged completion result (`OK ...`, `NO ...`, `BAD ...`).
fn check_completion(rest: &str) -> Result<()> {
    let upper = rest.to_ascii_uppercase();
    if upper.starts_with("OK") {
        Ok(())
    } else if upper.starts_with("NO") {
        Err(Error::No(rest.to_string()))
    } else if upper.starts_with("BAD") {
        Err(Error::Bad(rest.to_string()))
    } else {
        Err(Error::Protocol(format!("unexpected completion: {rest}")))
    }
}

/// Extracts a trailing literal length (`... {1234}`) from a response line.
fn literal_length(line: &str) -> Option<usize> {
    let line = line.trim_end();
    if !line.ends_with('}') {
        return None;
    }
    let open = line.rfind('{')?;
    line[open + 1..line.len() - 1].parse().ok()
}

/// Quotes a string for use in an IMAP command.
fn quote_string(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
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
    fn test_tag_generator_sequence() {
        let mut tags = TagGenerator::default();
        assert_eq!(tags.next(), "A0001");
        assert_eq!(tags.next(), "A0002");
    }

    #[test]
    fn test_literal_length() {
        assert_eq!(literal_length("* 1 FETCH (RFC822 {1234}"), Some(1234));
        assert_eq!(literal_length("* 1 FETCH (RFC822 {0}"), Some(0));
        assert_eq!(literal_length("* SEARCH 1 2 3"), None);
        assert_eq!(literal_length("* 1 FETCH {not-a-number}"), None);
    }

    #[test]
    fn test_quote_string() {
        assert_eq!(quote_string("user@example.com"), "\"user@example.com\"");
        assert_eq!(quote_string("pa\"ss"), "\"pa\\\"ss\"");
        assert_eq!(quote_string("back\\slash"), "\"back\\\\slash\"");
    }

    #[test]
    fn test_check_completion() {
        assert!(check_completion("OK LOGIN completed").is_ok());
        assert!(matches!(
            check_completion("NO invalid credentials"),
            Err(Error::No(_))
        ));
        assert!(matches!(check_completion("BAD syntax"), Err(Error::Bad(_))));
        assert!(matches!(
            check_completion("WEIRD thing"),
            Err(Error::Protocol(_))
        ));
    }
}
