// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use crate::client::{group_chat, presence};
use crate::stanza::Message;
use crate::{client, roster};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Client(client::Event),
    GroupChat(group_chat::Event),
    Message(Message),
    Presence(presence::Event),
    Roster(roster::Event),
}
