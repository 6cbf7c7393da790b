// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use tracing::{debug, warn};

use crate::client::Session;
use crate::jid::Jid;
use crate::stanza::{Message, MucHistory, MucJoin, StanzaFault, Status};
use crate::task::SendPresence;
use crate::Event as ClientEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupChatState {
    Connecting,
    Connected,
    Closing,
}

/// A room we joined or are joining. `jid` is the room address with our nickname as resource.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupChat {
    pub jid: Jid,
    pub state: GroupChatState,
    pub password: Option<String>,
}

impl GroupChat {
    pub(crate) fn close(&mut self) {
        self.state = GroupChatState::Closing
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Joined { jid: Jid },
    Left { jid: Jid },
    /// Joining failed, e.g. because the nickname is taken.
    Error { jid: Jid, error: StanzaFault },
    Presence { jid: Jid, status: Status },
}

impl Session {
    /// Returns false if the room is already being joined or is joined. A room that is being left
    /// is forgotten and joined afresh.
    pub(crate) fn join_group_chat(
        &mut self,
        room: &Jid,
        nick: &str,
        password: Option<&str>,
        history: MucHistory,
        mut status: Status,
    ) -> bool {
        let jid = match room.with_resource(nick) {
            Ok(jid) => jid,
            Err(err) => {
                warn!("Cannot join {} as '{}'. {}", room, nick, err);
                return false;
            }
        };

        if self
            .group_chats
            .iter()
            .any(|gc| gc.jid.bare_eq(&jid) && gc.state != GroupChatState::Closing)
        {
            return false;
        }
        self.group_chats.retain(|gc| !gc.jid.bare_eq(&jid));

        debug!("Joining {}", jid);
        let password = password.filter(|p| !p.is_empty()).map(ToString::to_string);
        self.group_chats.push(GroupChat {
            jid: jid.clone(),
            state: GroupChatState::Connecting,
            password: password.clone(),
        });

        status.muc = Some(MucJoin { password, history });
        self.start_task(None, SendPresence::new(&status, Some(&jid)), None);
        true
    }

    pub(crate) fn leave_group_chat(&mut self, room: &Jid) {
        let mut leaving = vec![];
        for gc in self.group_chats.iter_mut().filter(|gc| gc.jid.bare_eq(room)) {
            gc.close();
            debug!("Leaving {}", gc.jid);
            leaving.push(gc.jid.clone());
        }

        for jid in leaving {
            self.start_task(
                None,
                SendPresence::new(&Status::unavailable(), Some(&jid)),
                None,
            );
        }
    }

    pub(crate) fn change_group_chat_nick(&mut self, room: &Jid, nick: &str, mut status: Status) {
        let Some(gc) = self.group_chats.iter_mut().find(|gc| gc.jid.bare_eq(room)) else {
            return;
        };
        let jid = match gc.jid.with_resource(nick) {
            Ok(jid) => jid,
            Err(err) => {
                warn!("Cannot change nick in {} to '{}'. {}", room, nick, err);
                return;
            }
        };
        gc.jid = jid.clone();

        status.available = true;
        self.start_task(None, SendPresence::new(&status, Some(&jid)), None);
    }

    pub(crate) fn set_group_chat_status(&mut self, room: &Jid, mut status: Status) {
        let Some(jid) = self
            .group_chats
            .iter()
            .find(|gc| gc.jid.bare_eq(room))
            .map(|gc| gc.jid.clone())
        else {
            return;
        };

        status.available = true;
        self.start_task(None, SendPresence::new(&status, Some(&jid)), None);
    }

    pub(crate) fn group_chat_password(&self, room: &Jid) -> Option<String> {
        self.group_chats
            .iter()
            .find(|gc| gc.jid.bare_eq(room))
            .and_then(|gc| gc.password.clone())
    }

    /// Forwards a received message. Group chat messages are only forwarded while we are in the
    /// room.
    pub(crate) fn pm_message(&mut self, message: Message) {
        debug!("Message from {}", message.from);

        if message.is_groupchat()
            && !self.group_chats.iter().any(|gc| {
                gc.jid.bare_eq(&message.from) && gc.state == GroupChatState::Connected
            })
        {
            return;
        }

        self.emit(ClientEvent::Message(message))
    }
}
