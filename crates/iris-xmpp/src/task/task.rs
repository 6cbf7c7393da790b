// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use std::fmt::{Display, Formatter};

use minidom::Element;
use tracing::debug;

use crate::client::Session;
use crate::jid::Jid;
use crate::stanza::StanzaFault;
use crate::util::RequestError;

/// Arena index of a task node. Never reused within one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    pub(crate) const ROOT: TaskId = TaskId(0);
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Refers to a running task, e.g. to cancel it or to parent other tasks under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    pub(crate) id: TaskId,
}

/// Lifecycle of a live task. A finished or cancelled task is removed from the tree, so its
/// state reads as `None` afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Pending,
}

/// One in-flight protocol operation.
///
/// A request task builds and sends its stanza in [`Task::on_go`] and then claims the reply in
/// [`Task::take`], usually by matching [`TaskContext::id`]. A push task (see [`Task::is_push`])
/// never finishes and classifies every inbound stanza by kind.
pub trait Task: Send + 'static {
    fn is_push(&self) -> bool {
        false
    }

    fn on_go(&mut self, _ctx: &mut TaskContext<'_>) {}

    /// Returns true if the stanza was consumed. Once claimed, no other task sees it.
    fn take(&mut self, _ctx: &mut TaskContext<'_>, _stanza: &Element) -> bool {
        false
    }
}

/// What a task may do while it is being driven by the client.
pub struct TaskContext<'a> {
    session: &'a mut Session,
    task: TaskId,
    id: String,
    staged: Option<Vec<Element>>,
    outcome: Option<Result<(), RequestError>>,
}

impl<'a> TaskContext<'a> {
    pub(crate) fn new(session: &'a mut Session, task: TaskId, id: String) -> Self {
        TaskContext {
            session,
            task,
            id,
            staged: None,
            outcome: None,
        }
    }

    /// Collects sent stanzas instead of transmitting them.
    pub(crate) fn staging(mut self) -> Self {
        self.staged = Some(vec![]);
        self
    }

    /// The stanza id assigned when the task was started.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn task_id(&self) -> TaskId {
        self.task
    }

    /// Our own full address.
    pub fn local_jid(&self) -> &Jid {
        &self.session.jid
    }

    /// The server we are connected to.
    pub fn host(&self) -> Jid {
        self.session.jid.to_domain()
    }

    pub fn send(&mut self, stanza: Element) {
        match &mut self.staged {
            Some(staged) => staged.push(stanza),
            None => self.session.send(stanza),
        }
    }

    pub fn set_success(&mut self) {
        self.finish(Ok(()))
    }

    pub fn set_error(&mut self, error: RequestError) {
        self.finish(Err(error))
    }

    /// Fails with the `<error/>` carried by `stanza`.
    pub fn set_error_from(&mut self, stanza: &Element) {
        let error = match StanzaFault::from_stanza(stanza) {
            Some(fault) => RequestError::XMPP { err: fault },
            None => RequestError::UnexpectedResponse,
        };
        self.finish(Err(error))
    }

    pub(crate) fn session(&mut self) -> &mut Session {
        self.session
    }

    /// Completing twice is a logic error. Debug builds panic, release builds keep the first
    /// outcome.
    fn finish(&mut self, result: Result<(), RequestError>) {
        debug_assert!(
            self.outcome.is_none(),
            "Task {} ({}) completed twice",
            self.task,
            self.id
        );
        if self.outcome.is_some() {
            debug!("Ignoring second completion of task {}", self.task);
            return;
        }
        self.outcome = Some(result);
    }

    pub(crate) fn into_parts(self) -> (Option<Vec<Element>>, Option<Result<(), RequestError>>) {
        (self.staged, self.outcome)
    }
}
