// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use tracing::debug;

use crate::client::group_chat;
use crate::client::{GroupChatState, Session};
use crate::jid::Jid;
use crate::roster::Resource;
use crate::stanza::{StanzaFault, Status, SubscriptionKind};
use crate::Event as ClientEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ResourceAvailable { jid: Jid, resource: Resource },
    ResourceUnavailable { jid: Jid, resource: Resource },
    /// A presence of type `error` from someone who is not a group chat we're in.
    Error { jid: Jid, error: StanzaFault },
    Subscription {
        jid: Jid,
        kind: SubscriptionKind,
        nick: Option<String>,
    },
}

impl Session {
    pub(crate) fn pp_subscription(&mut self, jid: Jid, kind: SubscriptionKind, nick: Option<String>) {
        debug!("{} from {}", kind, jid);
        self.emit(ClientEvent::Presence(Event::Subscription { jid, kind, nick }))
    }

    /// Applies an inbound (or our own outbound) presence.
    ///
    /// Group chat presences go to the matching room. Error presences only raise an event. Our
    /// own presences update our resource list, everything else the roster items with the
    /// sender's bare address.
    pub(crate) fn pp_presence(&mut self, jid: &Jid, status: Status) {
        if status.available {
            debug!("{} is available.", jid);
        } else {
            debug!("{} is unavailable.", jid);
        }

        if let Some(idx) = self.group_chats.iter().position(|gc| gc.jid.bare_eq(jid)) {
            self.group_chat_presence(idx, jid, status);
            return;
        }

        if let Some(error) = &status.error {
            self.emit(ClientEvent::Presence(Event::Error {
                jid: jid.clone(),
                error: error.clone(),
            }));
            return;
        }

        if jid.bare_eq(&self.jid) {
            self.update_self_presence(jid, status);
            return;
        }

        let items: Vec<Jid> = self
            .roster
            .iter()
            .filter(|item| item.jid.bare_eq(jid))
            // An item with its own resource only tracks that resource.
            .filter(|item| item.jid.resource().is_none() || item.jid.resource() == jid.resource())
            .map(|item| item.jid.clone())
            .collect();

        for item in items {
            self.update_presence(&item, jid, status.clone());
        }
    }

    fn group_chat_presence(&mut self, idx: usize, jid: &Jid, status: Status) {
        let room = &mut self.group_chats[idx];
        let us = room.jid.resource() == jid.resource() || jid.resource().is_none();
        debug!("Group chat presence for {} from {} (us: {})", room.jid, jid, us);

        match room.state {
            GroupChatState::Connecting => {
                if us && status.has_error() {
                    let room = self.group_chats.remove(idx);
                    if let Some(error) = status.error {
                        self.emit(ClientEvent::GroupChat(group_chat::Event::Error {
                            jid: room.jid,
                            error,
                        }));
                    }
                    return;
                }

                // Only a non-error presence completes the join.
                if !status.has_error() {
                    room.state = GroupChatState::Connected;
                    let joined = room.jid.clone();
                    self.emit(ClientEvent::GroupChat(group_chat::Event::Joined { jid: joined }));
                }
                self.emit(ClientEvent::GroupChat(group_chat::Event::Presence {
                    jid: jid.clone(),
                    status,
                }));
            }
            GroupChatState::Connected => {
                self.emit(ClientEvent::GroupChat(group_chat::Event::Presence {
                    jid: jid.clone(),
                    status,
                }));
            }
            GroupChatState::Closing => {
                if us && !status.available {
                    let room = self.group_chats.remove(idx);
                    debug!("Left {}", room.jid);
                    self.emit(ClientEvent::GroupChat(group_chat::Event::Left { jid: room.jid }));
                }
            }
        }
    }

    fn update_self_presence(&mut self, jid: &Jid, status: Status) {
        let name = jid.resource().unwrap_or_default();

        if !status.available {
            if let Some(mut resource) = self.resources.remove(name) {
                debug!("Removing self resource: name=[{}]", name);
                resource.status = status;
                self.emit(ClientEvent::Presence(Event::ResourceUnavailable {
                    jid: jid.clone(),
                    resource,
                }));
            }
            return;
        }

        let resource = match self.resources.find_mut(name) {
            Some(resource) => {
                debug!("Updating self resource: name=[{}]", name);
                resource.status = status;
                resource.clone()
            }
            None => {
                debug!("Adding self resource: name=[{}]", name);
                let resource = Resource::new(name, status);
                self.resources.push(resource.clone());
                resource
            }
        };
        self.emit(ClientEvent::Presence(Event::ResourceAvailable {
            jid: jid.clone(),
            resource,
        }));
    }

    fn update_presence(&mut self, item_jid: &Jid, jid: &Jid, status: Status) {
        let name = jid.resource().unwrap_or_default();
        let Some(item) = self.roster.find_mut(item_jid) else {
            return;
        };

        if !status.available {
            let mut events = vec![];
            let mut resource = match item.resources.remove(name) {
                Some(resource) => {
                    debug!("Removing resource from [{}]: name=[{}]", item_jid, name);
                    resource
                }
                None => {
                    // Unknown resource. Materialise it so the unavailable event has a matching
                    // available one.
                    let resource = Resource::new(name, status.clone());
                    events.push(Event::ResourceAvailable {
                        jid: jid.clone(),
                        resource: resource.clone(),
                    });
                    resource
                }
            };
            resource.status = status.clone();
            item.last_unavailable_status = status;
            events.push(Event::ResourceUnavailable {
                jid: jid.clone(),
                resource,
            });

            for event in events {
                self.emit(ClientEvent::Presence(event));
            }
            return;
        }

        let resource = match item.resources.find_mut(name) {
            Some(resource) => {
                debug!("Updating resource to [{}]: name=[{}]", item_jid, name);
                resource.status = status;
                resource.clone()
            }
            None => {
                debug!("Adding resource to [{}]: name=[{}]", item_jid, name);
                let resource = Resource::new(name, status);
                item.resources.push(resource.clone());
                resource
            }
        };
        self.emit(ClientEvent::Presence(Event::ResourceAvailable {
            jid: jid.clone(),
            resource,
        }));
    }
}
