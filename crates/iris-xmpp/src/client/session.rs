// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use minidom::Element;
use tracing::{debug, warn};

use crate::client::{presence, Event, GroupChat};
use crate::connector::{ConnectionError, ConnectionEvent};
use crate::deps::{IDProvider, TimeProvider};
use crate::jid::Jid;
use crate::roster::{self, LiveRoster, LiveRosterItem, Resource, ResourceList, Roster};
use crate::roster::{RosterItem, Subscription};
use crate::stanza::{feature_not_implemented_reply, ns, Status};
use crate::task::{
    OnFinish, PushMessage, PushPresence, PushRoster, RosterTask, SendPresence, ServInfo, Task,
    TaskId, TaskSlot, TaskTree,
};
use crate::util::RequestError;
use crate::{Client, Event as ClientEvent};

/// The disco identity we announce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub category: String,
    pub type_: String,
    pub name: String,
}

impl Default for Identity {
    fn default() -> Self {
        Identity {
            category: "client".to_string(),
            type_: "pc".to_string(),
            name: String::new(),
        }
    }
}

/// What we tell others about ourselves: software version, disco identity, caps and features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
    pub os: String,
    pub identity: Identity,
    pub caps_node: String,
    pub caps_version: String,
    pub caps_ext: String,
    pub custom_features: Vec<String>,
    /// Features announced under `caps_node#<extension>`.
    pub extensions: BTreeMap<String, Vec<String>>,
}

impl Default for ClientInfo {
    fn default() -> Self {
        ClientInfo {
            name: "N/A".to_string(),
            version: "0.0".to_string(),
            os: "N/A".to_string(),
            identity: Identity::default(),
            caps_node: String::new(),
            caps_version: String::new(),
            caps_ext: String::new(),
            custom_features: vec![],
            extensions: BTreeMap::new(),
        }
    }
}

impl ClientInfo {
    pub fn caps_node_ver(&self) -> String {
        format!("{}#{}", self.caps_node, self.caps_version)
    }

    /// Built-in features followed by the configured ones.
    pub fn features(&self) -> impl Iterator<Item = &str> {
        [ns::DISCO_INFO, ns::VERSION]
            .into_iter()
            .chain(self.custom_features.iter().map(String::as_str))
    }
}

/// Deferred work produced while the session lock is held. Applied in order once it is released.
pub(crate) enum Effect {
    Send(Element),
    Event(ClientEvent),
    Callback(Box<dyn FnOnce(&Client) + Send>),
    Disconnect,
}

/// Everything belonging to one client: the task tree plus the roster, presence and group chat
/// state reconciled from inbound stanzas.
pub(crate) struct Session {
    pub jid: Jid,
    pub active: bool,
    pub connected: bool,
    pub roster: LiveRoster,
    pub resources: ResourceList,
    pub group_chats: Vec<GroupChat>,
    pub tasks: TaskTree,
    pub info: ClientInfo,
    id_provider: Box<dyn IDProvider>,
    time_provider: Box<dyn TimeProvider>,
    effects: Vec<Effect>,
}

impl Session {
    pub fn new(
        info: ClientInfo,
        id_provider: Box<dyn IDProvider>,
        time_provider: Box<dyn TimeProvider>,
    ) -> Self {
        let mut session = Session {
            jid: Jid::default(),
            active: false,
            connected: false,
            roster: LiveRoster::default(),
            resources: ResourceList::default(),
            group_chats: vec![],
            tasks: TaskTree::default(),
            info,
            id_provider,
            time_provider,
            effects: vec![],
        };

        session.start_task(None, PushPresence::default(), None);
        session.start_task(None, PushMessage::default(), None);
        session.start_task(None, PushRoster::default(), None);
        session.start_task(None, ServInfo::default(), None);

        session
    }

    pub fn new_id(&mut self) -> String {
        self.id_provider.new_id()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.time_provider.now()
    }

    pub fn send(&mut self, stanza: Element) {
        self.effects.push(Effect::Send(stanza))
    }

    pub fn emit(&mut self, event: ClientEvent) {
        self.effects.push(Effect::Event(event))
    }

    pub fn defer(&mut self, callback: impl FnOnce(&Client) + Send + 'static) {
        self.effects.push(Effect::Callback(Box::new(callback)))
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn has_effects(&self) -> bool {
        !self.effects.is_empty()
    }

    /// Creates a task below `parent` (or the root) and starts it.
    pub fn start_task<T: Task>(
        &mut self,
        parent: Option<TaskId>,
        task: T,
        on_finish: Option<OnFinish<T>>,
    ) -> Option<TaskId> {
        let id = self
            .tasks
            .insert(parent.unwrap_or(TaskId::ROOT), TaskSlot::new(task, on_finish))?;
        self.go_task(id, true);
        Some(id)
    }

    /// Called once the transport is up.
    pub fn start(&mut self, jid: Jid) {
        self.resources.clear();
        self.resources.push(Resource::new(
            jid.resource().unwrap_or_default(),
            Status::unavailable().at(self.now()),
        ));
        self.jid = jid;
        self.active = true;
        self.connected = true;
        self.emit(ClientEvent::Client(Event::Connected));
    }

    pub fn handle_connection_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Stanza(stanza) => self.distribute(stanza),
            ConnectionEvent::Disconnected { error } => self.handle_disconnect(error),
        }
    }

    /// Routes one inbound stanza. Stanzas with a malformed sender are dropped, requests nobody
    /// claims are answered with `feature-not-implemented`.
    pub fn distribute(&mut self, stanza: Element) {
        if let Some(from) = stanza.attr("from") {
            if !Jid::new(from).is_valid() {
                warn!("Dropping {} with invalid from '{}'.", stanza.name(), from);
                return;
            }
        }

        if self.dispatch_to_tasks(&stanza) {
            return;
        }

        if stanza.name() == "iq" && matches!(stanza.attr("type"), Some("get") | Some("set")) {
            warn!(
                "Unhandled IQ {} from {}. Replying with feature-not-implemented.",
                stanza.attr("id").unwrap_or_default(),
                stanza.attr("from").unwrap_or_default()
            );
            self.send(feature_not_implemented_reply(&stanza));
        }
    }

    /// Asks for the transport to be torn down once everything queued so far went out.
    pub fn queue_disconnect(&mut self) {
        self.effects.push(Effect::Disconnect)
    }

    pub fn handle_disconnect(&mut self, error: Option<ConnectionError>) {
        if !self.connected {
            debug!("Ignoring disconnect of an inactive session.");
            return;
        }
        match &error {
            Some(error) => debug!("Disconnected: {}", error),
            None => debug!("Disconnected."),
        }

        self.connected = false;
        self.fail_request_tasks(RequestError::Disconnected);
        self.cleanup();
        self.emit(ClientEvent::Client(Event::Disconnected { error }));
    }

    /// Forgets everything tied to the ended session. Contacts lose their resources, each one
    /// reported as unavailable.
    pub fn cleanup(&mut self) {
        self.active = false;
        self.group_chats.clear();
        self.resources.clear();

        let status = Status::unavailable().at(self.now());
        let mut gone = vec![];
        for item in self.roster.iter_mut() {
            if item.resources.is_empty() {
                continue;
            }
            let bare = item.jid.clone();
            item.last_unavailable_status = status.clone();
            for mut resource in item.resources.drain() {
                resource.status = status.clone();
                gone.push(presence::Event::ResourceUnavailable {
                    jid: bare.with_resource(&resource.name).unwrap_or(bare.clone()),
                    resource,
                });
            }
        }
        for event in gone {
            self.emit(ClientEvent::Presence(event));
        }
    }

    /// Retracts our presence from every group chat, then disconnects.
    pub fn close(&mut self) {
        if self.active {
            let rooms: Vec<Jid> = self
                .group_chats
                .iter_mut()
                .map(|gc| {
                    gc.close();
                    gc.jid.clone()
                })
                .collect();
            for room in rooms {
                self.start_task(
                    None,
                    SendPresence::new(&Status::unavailable(), Some(&room)),
                    None,
                );
            }
        }
        self.queue_disconnect();
    }

    /// Fetches the full roster. Items the server no longer lists are removed afterwards.
    pub fn request_roster(&mut self) {
        if !self.active {
            return;
        }

        self.roster.flag_all_for_delete();
        self.start_task(
            None,
            RosterTask::get(),
            Some(Box::new(
                |session: &mut Session, task: RosterTask, result: Result<(), RequestError>| {
                    session.roster_request_finished(task.into_roster(), result)
                },
            )),
        );
    }

    fn roster_request_finished(&mut self, fetched: Roster, result: Result<(), RequestError>) {
        match result {
            Ok(()) => {
                self.import_roster(fetched);
                for item in self.roster.sweep_flagged() {
                    debug!("(Removed) {} {}", Subscription::Remove.arrows(), item.jid);
                    self.emit(ClientEvent::Roster(roster::Event::ItemRemoved(item)));
                }
                self.emit(ClientEvent::Client(Event::RosterRequestFinished(Ok(()))));
            }
            // The disconnect itself is reported separately.
            Err(err) if err.is_disconnect() => (),
            Err(err) => self.emit(ClientEvent::Client(Event::RosterRequestFinished(Err(err)))),
        }
    }

    pub fn import_roster(&mut self, roster: Roster) {
        for item in roster {
            self.import_roster_item(item)
        }
    }

    fn import_roster_item(&mut self, item: RosterItem) {
        let line = format!(
            "{} {:<32}{}",
            item.subscription.arrows(),
            item.jid.full(),
            if item.name.is_empty() {
                String::new()
            } else {
                format!(" [{}]", item.name)
            }
        );

        if item.subscription == Subscription::Remove {
            if let Some(removed) = self.roster.remove(&item.jid) {
                self.emit(ClientEvent::Roster(roster::Event::ItemRemoved(removed)));
            }
            debug!("(Removed) {}", line);
            return;
        }

        if let Some(existing) = self.roster.find_mut(&item.jid) {
            existing.flag_for_delete = false;
            existing.set_roster_item(item);
            let updated = existing.clone();
            self.emit(ClientEvent::Roster(roster::Event::ItemUpdated(updated)));
            debug!("(Updated) {}", line);
            return;
        }

        let added = LiveRosterItem::new(item);
        self.roster.push(added.clone());
        self.emit(ClientEvent::Roster(roster::Event::ItemAdded(added)));
        debug!("(Added)   {}", line);
    }

    /// Sends our presence and applies it to our own resource list.
    pub fn set_presence(&mut self, status: Status) {
        self.start_task(None, SendPresence::new(&status, None), None);
        let jid = self.jid.clone();
        self.pp_presence(&jid, status);
    }
}
