//! Transport collaborator interface.
//!
//! The connection itself (handshake, TLS, reconnect) lives outside this
//! crate. We only consume it through [`Connection`] and reject unsupported
//! URL schemes before any connector is touched.

use crate::utils::error::TransportError;
use log::{error, info};
use url::Url;

const WS_SCHEME: &str = "ws";
const WSS_SCHEME: &str = "wss";

/// Callback invoked with every inbound text message
pub type MessageHandler = Box<dyn Fn(String) + Send + Sync + 'static>;

/// An open, text-framed connection
pub trait Connection: Send + Sync {
    fn send(&self, text: &str) -> Result<(), TransportError>;

    /// Install the inbound message handler, replacing any previous one
    fn on_message(&self, handler: MessageHandler);

    fn is_open(&self) -> bool;

    fn close(&self);
}

/// Opens connections for validated URLs
pub trait Connector {
    type Conn: Connection;

    fn open(&self, url: &Url) -> Result<Self::Conn, TransportError>;
}

/// Parse `url` and require a `ws` or `wss` scheme
pub fn parse_ws_url(url: &str) -> Result<Url, TransportError> {
    let parsed = Url::parse(url)?;
    match parsed.scheme() {
        WS_SCHEME | WSS_SCHEME => Ok(parsed),
        other => {
            error!("Only WS(S) is supported, got scheme '{}'", other);
            Err(TransportError::UnsupportedScheme(other.to_string()))
        }
    }
}

/// Connect through `connector` after validating the URL
pub fn connect<C: Connector>(connector: &C, url: &str) -> Result<C::Conn, TransportError> {
    let url = parse_ws_url(url)?;
    info!("Connecting to {}", url);
    connector.open(&url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct NullConnection;

    impl Connection for NullConnection {
        fn send(&self, _text: &str) -> Result<(), TransportError> {
            Ok(())
        }
        fn on_message(&self, _handler: MessageHandler) {}
        fn is_open(&self) -> bool {
            true
        }
        fn close(&self) {}
    }

    #[derive(Default)]
    struct CountingConnector {
        opened: Cell<usize>,
    }

    impl Connector for CountingConnector {
        type Conn = NullConnection;

        fn open(&self, _url: &Url) -> Result<NullConnection, TransportError> {
            self.opened.set(self.opened.get() + 1);
            Ok(NullConnection)
        }
    }

    #[test]
    fn test_accepts_ws_and_wss() {
        assert!(parse_ws_url("ws://127.0.0.1:9899/ws").is_ok());
        assert!(parse_ws_url("WSS://example.com/ws").is_ok());
    }

    #[test]
    fn test_rejects_other_schemes_before_connecting() {
        let connector = CountingConnector::default();
        let err = connect(&connector, "http://example.com").err().unwrap();
        assert!(matches!(err, TransportError::UnsupportedScheme(ref s) if s == "http"));
        assert_eq!(connector.opened.get(), 0);
    }

    #[test]
    fn test_rejects_unparsable_url() {
        assert!(matches!(
            parse_ws_url("not a url"),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_connect_opens_valid_url() {
        let connector = CountingConnector::default();
        let conn = connect(&connector, "ws://localhost/ws").unwrap();
        assert!(conn.is_open());
        assert_eq!(connector.opened.get(), 1);
    }
}
