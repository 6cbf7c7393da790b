// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

pub use error::{legacy_code, StanzaFault};
pub use iq::{create_iq, create_query_iq, feature_not_implemented_reply, iq_verify};
pub use message::{Message, MessageType};
pub use status::{
    MucDestroy, MucHistory, MucItem, MucJoin, Status, StatusType, SubscriptionKind,
};

mod error;
mod iq;
mod message;
pub mod ns;
mod status;
