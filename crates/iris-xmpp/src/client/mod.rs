// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

pub use builder::ClientBuilder;
pub use client::Client;
pub use group_chat::{GroupChat, GroupChatState};
pub(crate) use session::Session;
pub use session::{ClientInfo, Identity};

use crate::connector::{ConnectionError, Connector};
use crate::util::RequestError;
use crate::Event as ClientEvent;

mod builder;
mod client;
pub mod group_chat;
pub mod presence;
mod session;

pub type EventHandler = Box<dyn Fn(Client, ClientEvent) + Send + Sync>;

pub type ConnectorProvider = Box<dyn Fn() -> Box<dyn Connector> + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connected,
    Disconnected { error: Option<ConnectionError> },
    /// A full roster refresh finished. Not sent when the refresh failed because we disconnected.
    RosterRequestFinished(Result<(), RequestError>),
}
