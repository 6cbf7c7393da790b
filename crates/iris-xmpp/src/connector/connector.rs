// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use anyhow::Result;
use async_trait::async_trait;
use minidom::Element;
use secrecy::Secret;

use crate::jid::Jid;

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ConnectionError {
    #[error("Timed out")]
    TimedOut,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{msg:?}")]
    Generic { msg: String },
}

/// Receives everything the transport produces, in order.
pub type ConnectionEventHandler = Box<dyn Fn(ConnectionEvent) + Send + Sync>;

/// Establishes the XML stream (TCP, TLS, SASL, resource binding) for `jid`.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        jid: &Jid,
        password: Secret<String>,
        event_handler: ConnectionEventHandler,
    ) -> Result<Box<dyn Connection>, ConnectionError>;
}

#[derive(Debug)]
pub enum ConnectionEvent {
    Disconnected { error: Option<ConnectionError> },
    Stanza(Element),
}

pub trait Connection: Send + Sync {
    fn send_stanza(&self, stanza: Element) -> Result<()>;
    /// Writes `xml` to the stream as is.
    fn send_raw(&self, xml: &str) -> Result<()>;
    fn disconnect(&self);
}
