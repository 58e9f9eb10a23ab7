//! Integration tests for the thin IMAP client.
//!
//! These tests use a mock stream to simulate IMAP server responses
//! without requiring a real server connection.

#![allow(clippy::unwrap_used)]

use std::io::{self, Cursor};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use maildigest_imap::{Client, Error};

/// Mock stream that returns predefined responses.
struct MockStream {
    /// Responses to return (in order).
    responses: Cursor<Vec<u8>>,
    /// Captured commands sent by the client.
    sent: Vec<u8>,
}

impl MockStream {
    fn new(responses: &[u8]) -> Self {
        Self {
            responses: Cursor::new(responses.to_vec()),
            sent: Vec::new(),
        }
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let pos = usize::try_from(self.responses.position()).unwrap();
        let data = self.responses.get_ref();

        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        let remaining = &data[pos..];
        let to_read = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.responses.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn test_greeting_consumed() {
    let stream = MockStream::new(b"* OK IMAP4rev1 Service Ready\r\n");
    let client = Client::from_stream(stream).await;
    assert!(client.is_ok());
}

#[tokio::test]
async fn test_greeting_bye_rejected() {
    let stream = MockStream::new(b"* BYE shutting down\r\n");
    let client = Client::from_stream(stream).await;
    assert!(matches!(client, Err(Error::Bye(_))));
}

#[tokio::test]
async fn test_login_success() {
    let stream = MockStream::new(b"* OK ready\r\nA0001 OK LOGIN completed\r\n");
    let client = Client::from_stream(stream).await.unwrap();
    let session = client.login("user@example.com", "secret").await;
    assert!(session.is_ok());
}

#[tokio::test]
async fn test_login_rejected_maps_to_auth_error() {
    let stream = MockStream::new(b"* OK ready\r\nA0001 NO [AUTHENTICATIONFAILED] bad creds\r\n");
    let client = Client::from_stream(stream).await.unwrap();
    let result = client.login("user@example.com", "wrong").await;
    assert!(matches!(result, Err(Error::Auth(_))));
}

#[tokio::test]
async fn test_select_reports_exists() {
    let stream = MockStream::new(
        b"* OK ready\r\n\
          A0001 OK LOGIN completed\r\n\
          * 23 EXISTS\r\n\
          * 0 RECENT\r\n\
          A0002 OK [READ-WRITE] SELECT completed\r\n",
    );
    let client = Client::from_stream(stream).await.unwrap();
    let mut session = client.login("u", "p").await.unwrap();
    let exists = session.select("INBOX").await.unwrap();
    assert_eq!(exists, 23);
}

#[tokio::test]
async fn test_search_parses_uids() {
    let stream = MockStream::new(
        b"* OK ready\r\n\
          A0001 OK LOGIN completed\r\n\
          * SEARCH 101 205 309\r\n\
          A0002 OK SEARCH completed\r\n",
    );
    let client = Client::from_stream(stream).await.unwrap();
    let mut session = client.login("u", "p").await.unwrap();
    let uids = session
        .search_from_since("advisor@example.com", "8-Aug-2026")
        .await
        .unwrap();
    assert_eq!(uids, vec![101, 205, 309]);
}

#[tokio::test]
async fn test_search_empty_result() {
    let stream = MockStream::new(
        b"* OK ready\r\n\
          A0001 OK LOGIN completed\r\n\
          * SEARCH\r\n\
          A0002 OK SEARCH completed\r\n",
    );
    let client = Client::from_stream(stream).await.unwrap();
    let mut session = client.login("u", "p").await.unwrap();
    let uids = session
        .search_from_since("advisor@example.com", "8-Aug-2026")
        .await
        .unwrap();
    assert!(uids.is_empty());
}

#[tokio::test]
async fn test_fetch_reads_literal() {
    let body = b"From: a@b.c\r\nSubject: Hi\r\n\r\nBody";
    let mut responses = Vec::new();
    responses.extend_from_slice(b"* OK ready\r\n");
    responses.extend_from_slice(b"A0001 OK LOGIN completed\r\n");
    responses.extend_from_slice(format!("* 1 FETCH (RFC822 {{{}}}\r\n", body.len()).as_bytes());
    responses.extend_from_slice(body);
    responses.extend_from_slice(b")\r\n");
    responses.extend_from_slice(b"A0002 OK FETCH completed\r\n");

    let client = Client::from_stream(MockStream::new(&responses))
        .await
        .unwrap();
    let mut session = client.login("u", "p").await.unwrap();
    let raw = session.fetch_raw(42).await.unwrap();
    assert_eq!(raw, body);
}

#[tokio::test]
async fn test_fetch_without_literal_is_protocol_error() {
    let stream = MockStream::new(
        b"* OK ready\r\n\
          A0001 OK LOGIN completed\r\n\
          A0002 OK FETCH completed\r\n",
    );
    let client = Client::from_stream(stream).await.unwrap();
    let mut session = client.login("u", "p").await.unwrap();
    let result = session.fetch_raw(42).await;
    assert!(matches!(result, Err(Error::Protocol(_))));
}

#[tokio::test]
async fn test_logout_tolerates_bye() {
    let stream = MockStream::new(
        b"* OK ready\r\n\
          A0001 OK LOGIN completed\r\n\
          * BYE logging out\r\n\
          A0002 OK LOGOUT completed\r\n",
    );
    let client = Client::from_stream(stream).await.unwrap();
    let session = client.login("u", "p").await.unwrap();
    assert!(session.logout().await.is_ok());
}
