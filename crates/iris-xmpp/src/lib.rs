// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

pub use client::{Client, ClientBuilder};
pub use connector::{Connection, ConnectionError, Connector};
pub use deps::{IDProvider, SeededIDProvider, SystemTimeProvider, TimeProvider};
pub use event::Event;
pub use jid::{Jid, JidError};
pub use stanza::ns;
pub use util::{ElementExt, ParseError, RequestError};

pub mod client;
pub mod connector;
mod deps;
mod event;
pub mod jid;
pub mod roster;
pub mod stanza;
pub mod task;
mod util;

#[cfg(feature = "test")]
pub mod test;
