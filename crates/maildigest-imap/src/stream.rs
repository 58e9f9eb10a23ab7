//! TLS stream setup for IMAP connections.

use std::sync::Arc;

use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use crate::{Config, Result};

/// Creates a TLS connector with default root certificates.
fn create_tls_connector() -> TlsConnector {
    let root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

/// Connects to the configured server with TLS from the start.
///
/// # Errors
///
/// Returns an error if the TCP connection or TLS handshake fails, or if the
/// hostname is not a valid DNS name.
pub async fn connect_tls(config: &Config) -> Result<TlsStream<TcpStream>> {
    let addr = format!("{}:{}", config.host, config.port);
    let tcp = TcpStream::connect(&addr).await?;

    let connector = create_tls_connector();
    let server_name = ServerName::try_from(config.host.clone())?;
    let tls = connector.connect(server_name, tcp).await?;

    Ok(tls)
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
    fn test_create_tls_connector() {
        // Root store construction must not panic with the bundled roots
        let _connector = create_tls_connector();
    }
}
