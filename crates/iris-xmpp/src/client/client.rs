// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use minidom::Element;
use parking_lot::{Mutex, RwLock};
use secrecy::Secret;
use tracing::{debug, error};

use crate::client::builder::ClientBuilder;
use crate::client::session::{ClientInfo, Effect, Session};
use crate::client::{ConnectorProvider, EventHandler, GroupChat};
use crate::connector::{Connection, ConnectionError, ConnectionEvent};
use crate::deps::{IDProvider, TimeProvider};
use crate::jid::Jid;
use crate::roster::{LiveRoster, ResourceList};
use crate::stanza::{ns, Message, MucHistory, Status, SubscriptionKind};
use crate::task::{IqRequest, RosterTask, SendMessage, SendPresence, Task, TaskHandle, TaskState};
use crate::util::{ElementExt, RequestError};

/// An XMPP session.
///
/// All state lives behind one lock. Work triggered by an inbound stanza or by a call on the
/// client (stanzas to send, events, completion callbacks) is queued while the lock is held and
/// carried out in order right after it is released, before the call returns. Calls made from
/// within an event handler or callback are queued behind the work that is already in flight.
#[derive(Clone)]
pub struct Client {
    pub(super) inner: Arc<ClientInner>,
}

impl Debug for Client {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish()
    }
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(super) fn new(
        connector_provider: ConnectorProvider,
        event_handler: EventHandler,
        info: ClientInfo,
        id_provider: Box<dyn IDProvider>,
        time_provider: Box<dyn TimeProvider>,
    ) -> Self {
        Client {
            inner: Arc::new(ClientInner {
                connector_provider,
                connection: Default::default(),
                session: Mutex::new(Session::new(info, id_provider, time_provider)),
                inbound: Default::default(),
                pumping: AtomicBool::new(false),
                event_handler,
            }),
        }
    }

    pub async fn connect(
        &self,
        jid: &Jid,
        password: impl Into<String>,
    ) -> Result<(), ConnectionError> {
        self.inner
            .clone()
            .connect(jid, Secret::new(password.into()))
            .await
    }

    /// Leaves every group chat, then tears down the connection.
    pub fn close(&self) {
        self.inner.with_session(|session| session.close())
    }

    /// Tears down the connection without retracting any presence first.
    pub fn disconnect(&self) {
        self.inner.with_session(|session| session.queue_disconnect())
    }

    pub fn jid(&self) -> Jid {
        self.inner.session.lock().jid.clone()
    }

    pub fn is_active(&self) -> bool {
        self.inner.session.lock().active
    }

    pub fn roster(&self) -> LiveRoster {
        self.inner.session.lock().roster.clone()
    }

    /// Our own resources and their presence.
    pub fn resources(&self) -> ResourceList {
        self.inner.session.lock().resources.clone()
    }

    pub fn group_chats(&self) -> Vec<GroupChat> {
        self.inner.session.lock().group_chats.clone()
    }

    /// Fetches the complete roster, reconciling it with the local copy. Does nothing unless
    /// connected.
    pub fn request_roster(&self) {
        self.inner.with_session(|session| session.request_roster())
    }

    pub fn update_roster_item(
        &self,
        jid: &Jid,
        name: &str,
        groups: &[String],
        on_finish: impl FnOnce(Result<(), RequestError>) + Send + 'static,
    ) -> Option<TaskHandle> {
        self.start_task(None, RosterTask::set(jid, name, groups), move |_, result| {
            on_finish(result)
        })
    }

    pub fn remove_roster_item(
        &self,
        jid: &Jid,
        on_finish: impl FnOnce(Result<(), RequestError>) + Send + 'static,
    ) -> Option<TaskHandle> {
        self.start_task(None, RosterTask::remove(jid), move |_, result| {
            on_finish(result)
        })
    }

    /// Broadcasts our presence.
    pub fn set_presence(&self, status: Status) {
        self.inner.with_session(|session| session.set_presence(status))
    }

    pub fn send_subscription(&self, jid: &Jid, kind: SubscriptionKind, nick: Option<&str>) {
        let task = SendPresence::subscription(jid, kind, nick);
        self.inner.with_session(|session| {
            session.start_task(None, task, None);
        })
    }

    pub fn send_message(&self, message: Message) {
        self.inner.with_session(|session| {
            session.start_task(None, SendMessage::new(message), None);
        })
    }

    /// Joins the group chat `room` (a bare room address) as `nick`. Returns false if the room is
    /// already joined or being joined.
    pub fn join_group_chat(
        &self,
        room: &Jid,
        nick: &str,
        password: Option<&str>,
        history: MucHistory,
        status: Status,
    ) -> bool {
        self.inner.with_session(|session| {
            session.join_group_chat(room, nick, password, history, status)
        })
    }

    pub fn leave_group_chat(&self, room: &Jid) {
        self.inner
            .with_session(|session| session.leave_group_chat(room))
    }

    pub fn change_group_chat_nick(&self, room: &Jid, nick: &str, status: Status) {
        self.inner
            .with_session(|session| session.change_group_chat_nick(room, nick, status))
    }

    pub fn set_group_chat_status(&self, room: &Jid, status: Status) {
        self.inner
            .with_session(|session| session.set_group_chat_status(room, status))
    }

    pub fn group_chat_password(&self, room: &Jid) -> Option<String> {
        self.inner.session.lock().group_chat_password(room)
    }

    /// Sends an IQ get or set and calls `on_finish` with the reply.
    pub fn send_iq(
        &self,
        request: Element,
        on_finish: impl FnOnce(Result<Element, RequestError>) + Send + 'static,
    ) -> Option<TaskHandle> {
        self.start_task(None, IqRequest::new(request), move |task, result| {
            on_finish(result.and_then(|_| {
                task.into_response()
                    .ok_or(RequestError::UnexpectedResponse)
            }))
        })
    }

    /// Starts `task` below `parent` (or at the top level). `on_finish` runs once the task
    /// completes, unless it or one of its ancestors was cancelled before. Returns `None` if
    /// `parent` doesn't exist anymore.
    pub fn start_task<T: Task>(
        &self,
        parent: Option<TaskHandle>,
        task: T,
        on_finish: impl FnOnce(T, Result<(), RequestError>) + Send + 'static,
    ) -> Option<TaskHandle> {
        self.inner.with_session(|session| {
            session
                .start_task(
                    parent.map(|p| p.id),
                    task,
                    Some(Box::new(
                        |session: &mut Session, task: T, result: Result<(), RequestError>| {
                            session.defer(move |_| on_finish(task, result))
                        },
                    )),
                )
                .map(|id| TaskHandle { id })
        })
    }

    /// Destroys the task and all tasks below it. Their completion handlers never run and their
    /// ids no longer match replies.
    pub fn cancel_task(&self, handle: TaskHandle) -> bool {
        self.inner
            .with_session(|session| session.cancel_task(handle.id))
    }

    /// `None` once the task finished or was cancelled.
    pub fn task_state(&self, handle: TaskHandle) -> Option<TaskState> {
        self.inner.session.lock().tasks.state(handle.id)
    }

    pub fn send_raw_stanza(&self, stanza: impl Into<Element>) -> Result<()> {
        self.inner.transmit(stanza.into())
    }

    pub fn send_raw_xml(&self, xml: &str) -> Result<()> {
        let connection = self.inner.connection.read();
        let Some(connection) = connection.as_ref() else {
            return Err(anyhow::format_err!("Not connected"));
        };
        connection.send_raw(xml)
    }
}

pub(super) struct ClientInner {
    connector_provider: ConnectorProvider,
    connection: RwLock<Option<Box<dyn Connection>>>,
    session: Mutex<Session>,
    inbound: Mutex<VecDeque<ConnectionEvent>>,
    pumping: AtomicBool,
    event_handler: EventHandler,
}

impl ClientInner {
    async fn connect(
        self: Arc<Self>,
        jid: &Jid,
        password: Secret<String>,
    ) -> Result<(), ConnectionError> {
        if !jid.is_valid() {
            return Err(ConnectionError::Generic {
                msg: format!("Invalid JID '{}'", jid),
            });
        }

        self.with_session(|session| {
            if session.connected {
                session.queue_disconnect()
            }
        });

        let inner = Arc::downgrade(&self);
        let connection = (self.connector_provider)()
            .connect(
                jid,
                password,
                Box::new(move |event| {
                    if let Some(inner) = inner.upgrade() {
                        inner.handle_connection_event(event)
                    }
                }),
            )
            .await?;

        self.connection.write().replace(connection);
        self.with_session(|session| session.start(jid.clone()));

        Ok(())
    }

    fn handle_connection_event(self: &Arc<Self>, event: ConnectionEvent) {
        #[cfg(feature = "trace-stanzas")]
        if let ConnectionEvent::Stanza(stanza) = &event {
            tracing::trace!("IN: {}", String::from(stanza));
        }

        self.inbound.lock().push_back(event);
        self.pump();
    }

    fn with_session<R>(self: &Arc<Self>, f: impl FnOnce(&mut Session) -> R) -> R {
        let result = f(&mut self.session.lock());
        self.pump();
        result
    }

    /// Carries out queued effects and processes queued inbound events until both queues are
    /// empty. Only one caller pumps at a time, nested calls return right away and leave their
    /// work to the active pump.
    fn pump(self: &Arc<Self>) {
        loop {
            if self.pumping.swap(true, Ordering::AcqRel) {
                return;
            }

            loop {
                let effects = self.session.lock().take_effects();
                if !effects.is_empty() {
                    for effect in effects {
                        self.apply(effect);
                    }
                    continue;
                }

                let Some(event) = self.inbound.lock().pop_front() else {
                    break;
                };
                self.session.lock().handle_connection_event(event);
            }

            self.pumping.store(false, Ordering::Release);

            // Work queued by another thread between the last check and releasing the flag.
            if self.inbound.lock().is_empty() && !self.session.lock().has_effects() {
                return;
            }
        }
    }

    fn apply(self: &Arc<Self>, effect: Effect) {
        match effect {
            Effect::Send(stanza) => {
                if let Err(err) = self.transmit(stanza) {
                    error!("Failed to send stanza. {}", err);
                }
            }
            Effect::Event(event) => (self.event_handler)(
                Client {
                    inner: self.clone(),
                },
                event,
            ),
            Effect::Callback(callback) => callback(&Client {
                inner: self.clone(),
            }),
            Effect::Disconnect => {
                let connection = self.connection.write().take();
                if let Some(connection) = connection {
                    connection.disconnect();
                }
                self.session.lock().handle_disconnect(None);
            }
        }
    }

    /// Stanzas sent while not connected are dropped.
    fn transmit(&self, stanza: Element) -> Result<()> {
        let stanza = stanza.with_default_ns(ns::JABBER_CLIENT);

        let connection = self.connection.read();
        let Some(connection) = connection.as_ref() else {
            debug!("Dropping {} while not connected.", stanza.name());
            return Ok(());
        };

        #[cfg(feature = "trace-stanzas")]
        tracing::trace!("OUT: {}", String::from(&stanza));

        connection.send_stanza(stanza)
    }
}
