// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use std::collections::{HashMap, HashSet};

use minidom::Element;
use tracing::debug;

use crate::client::Session;
use crate::task::{Task, TaskContext, TaskId, TaskState};
use crate::util::RequestError;

pub(crate) type OnFinish<T> = Box<dyn FnOnce(&mut Session, T, Result<(), RequestError>) + Send>;

/// A task together with the typed completion handler captured when it was created.
pub(crate) trait ErasedTask: Send {
    fn is_push(&self) -> bool;
    fn on_go(&mut self, ctx: &mut TaskContext<'_>);
    fn take(&mut self, ctx: &mut TaskContext<'_>, stanza: &Element) -> bool;
    fn finish(self: Box<Self>, session: &mut Session, result: Result<(), RequestError>);
}

pub(crate) struct TaskSlot<T: Task> {
    task: T,
    on_finish: Option<OnFinish<T>>,
}

impl<T: Task> TaskSlot<T> {
    pub fn new(task: T, on_finish: Option<OnFinish<T>>) -> Box<Self> {
        Box::new(TaskSlot { task, on_finish })
    }
}

impl<T: Task> ErasedTask for TaskSlot<T> {
    fn is_push(&self) -> bool {
        self.task.is_push()
    }

    fn on_go(&mut self, ctx: &mut TaskContext<'_>) {
        self.task.on_go(ctx)
    }

    fn take(&mut self, ctx: &mut TaskContext<'_>, stanza: &Element) -> bool {
        self.task.take(ctx, stanza)
    }

    fn finish(self: Box<Self>, session: &mut Session, result: Result<(), RequestError>) {
        if let Some(on_finish) = self.on_finish {
            on_finish(session, self.task, result)
        }
    }
}

struct Node {
    parent: TaskId,
    children: Vec<TaskId>,
    /// Taken out while the task is being driven.
    task: Option<Box<dyn ErasedTask>>,
    push: bool,
    state: TaskState,
    id: String,
}

/// Arena holding every live task below the implicit root.
///
/// Finished or cancelled tasks are removed together with their subtree, so nothing below them
/// can claim a stanza or fire a completion afterwards.
pub(crate) struct TaskTree {
    nodes: HashMap<TaskId, Node>,
    pending_ids: HashSet<String>,
    next: u64,
}

impl Default for TaskTree {
    fn default() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            TaskId::ROOT,
            Node {
                parent: TaskId::ROOT,
                children: vec![],
                task: None,
                push: false,
                state: TaskState::Pending,
                id: String::new(),
            },
        );
        TaskTree {
            nodes,
            pending_ids: HashSet::new(),
            next: 1,
        }
    }
}

impl TaskTree {
    /// Adds `task` as the last child of `parent`. Push tasks are placed ahead of every request
    /// task so they always see a stanza first. Returns `None` if `parent` no longer exists.
    pub fn insert(&mut self, parent: TaskId, task: Box<dyn ErasedTask>) -> Option<TaskId> {
        if !self.nodes.contains_key(&parent) {
            return None;
        }
        let push = task.is_push();
        let id = TaskId(self.next);
        self.next += 1;

        let pos = if push {
            self.children(parent)
                .iter()
                .position(|child| self.nodes.get(child).map(|n| !n.push).unwrap_or(true))
        } else {
            None
        };
        let parent_node = self.nodes.get_mut(&parent)?;
        match pos {
            Some(pos) => parent_node.children.insert(pos, id),
            None => parent_node.children.push(id),
        }

        self.nodes.insert(
            id,
            Node {
                parent,
                children: vec![],
                task: Some(task),
                push,
                state: TaskState::Created,
                id: String::new(),
            },
        );
        Some(id)
    }

    pub fn contains(&self, task: TaskId) -> bool {
        task != TaskId::ROOT && self.nodes.contains_key(&task)
    }

    pub fn state(&self, task: TaskId) -> Option<TaskState> {
        self.nodes.get(&task).map(|n| n.state)
    }

    #[cfg(test)]
    pub fn stanza_id(&self, task: TaskId) -> Option<&str> {
        self.nodes.get(&task).map(|n| n.id.as_str())
    }

    #[cfg(test)]
    pub fn parent(&self, task: TaskId) -> Option<TaskId> {
        self.nodes
            .get(&task)
            .filter(|_| task != TaskId::ROOT)
            .map(|n| n.parent)
    }

    pub fn children(&self, task: TaskId) -> &[TaskId] {
        self.nodes
            .get(&task)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    pub fn is_pending_id(&self, id: &str) -> bool {
        self.pending_ids.contains(id)
    }

    #[cfg(test)]
    /// Number of live tasks, not counting the root.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Detaches `task` and its whole subtree. Returns the detached tasks, `task` first.
    pub fn remove(&mut self, task: TaskId) -> Vec<(TaskId, Option<Box<dyn ErasedTask>>)> {
        if task == TaskId::ROOT {
            return vec![];
        }
        let Some(parent) = self.nodes.get(&task).map(|n| n.parent) else {
            return vec![];
        };
        if let Some(parent) = self.nodes.get_mut(&parent) {
            parent.children.retain(|child| *child != task);
        }

        let mut removed = vec![];
        let mut stack = vec![task];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.remove(&id) else {
                continue;
            };
            self.pending_ids.remove(&node.id);
            stack.extend(node.children.iter().rev());
            removed.push((id, node.task));
        }
        removed
    }

    /// Every task in depth-first order.
    fn preorder(&self) -> Vec<TaskId> {
        let mut order = vec![];
        let mut stack: Vec<TaskId> = self.children(TaskId::ROOT).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        order
    }

    fn checkout(&mut self, task: TaskId) -> Option<(Box<dyn ErasedTask>, String)> {
        let node = self.nodes.get_mut(&task)?;
        let erased = node.task.take()?;
        Some((erased, node.id.clone()))
    }

    fn checkin(&mut self, task: TaskId, erased: Box<dyn ErasedTask>) {
        if let Some(node) = self.nodes.get_mut(&task) {
            node.task = Some(erased)
        }
    }
}

/// Operations on the tree that need to hand the session to the tasks they drive.
impl Session {
    /// Assigns a fresh id and runs the task's `on_go`. With `send` unset the stanzas the task
    /// produced are returned instead of being transmitted.
    pub(crate) fn go_task(&mut self, task: TaskId, send: bool) -> Vec<Element> {
        match self.tasks.state(task) {
            Some(TaskState::Created) => (),
            state => {
                debug_assert!(false, "Task {} started in state {:?}", task, state);
                return vec![];
            }
        }

        // Push tasks match stanzas by kind and never need an id.
        let is_push = self.tasks.nodes.get(&task).map(|n| n.push).unwrap_or(false);
        let id = if is_push {
            String::new()
        } else {
            let id = self.new_id();
            assert!(
                !self.tasks.is_pending_id(&id),
                "Generated task id {} is already in use",
                id
            );
            self.tasks.pending_ids.insert(id.clone());
            id
        };
        if let Some(node) = self.tasks.nodes.get_mut(&task) {
            node.id = id;
            node.state = TaskState::Pending;
        }

        let Some((mut erased, id)) = self.tasks.checkout(task) else {
            return vec![];
        };

        let mut ctx = TaskContext::new(self, task, id);
        if !send {
            ctx = ctx.staging();
        }
        erased.on_go(&mut ctx);
        let (staged, outcome) = ctx.into_parts();

        self.settle(task, erased, outcome);
        staged.unwrap_or_default()
    }

    /// Offers `stanza` to the task tree. The walk visits every task depth-first, a task before
    /// its children, and stops at the first task that claims the stanza.
    pub(crate) fn dispatch_to_tasks(&mut self, stanza: &Element) -> bool {
        self.dispatch_children(TaskId::ROOT, stanza)
    }

    fn dispatch_children(&mut self, parent: TaskId, stanza: &Element) -> bool {
        let children = self.tasks.children(parent).to_vec();
        for child in children {
            if self.tasks.state(child) != Some(TaskState::Pending) {
                continue;
            }
            if self.offer(child, stanza) {
                return true;
            }
            if self.dispatch_children(child, stanza) {
                return true;
            }
        }
        false
    }

    fn offer(&mut self, task: TaskId, stanza: &Element) -> bool {
        let Some((mut erased, id)) = self.tasks.checkout(task) else {
            return false;
        };

        let mut ctx = TaskContext::new(self, task, id);
        let claimed = erased.take(&mut ctx, stanza);
        let (_, outcome) = ctx.into_parts();

        self.settle(task, erased, outcome);
        claimed
    }

    fn settle(
        &mut self,
        task: TaskId,
        erased: Box<dyn ErasedTask>,
        outcome: Option<Result<(), RequestError>>,
    ) {
        let Some(result) = outcome else {
            self.tasks.checkin(task, erased);
            return;
        };

        if !self.tasks.contains(task) {
            // Cancelled while it was running.
            return;
        }

        match &result {
            Ok(_) => debug!("Task {} succeeded", task),
            Err(err) => debug!("Task {} failed: {}", task, err),
        }
        self.tasks.remove(task);
        erased.finish(self, result);
    }

    /// Destroys a task and its subtree. No completion handler below it fires.
    pub(crate) fn cancel_task(&mut self, task: TaskId) -> bool {
        let removed = self.tasks.remove(task);
        if !removed.is_empty() {
            debug!("Cancelled task {} ({} tasks)", task, removed.len());
        }
        !removed.is_empty()
    }

    /// Fails every pending request task with `error`, parents before their children, and
    /// detaches it. Push tasks stay in place.
    pub(crate) fn fail_request_tasks(&mut self, error: RequestError) {
        let mut failed = vec![];
        for task in self.tasks.preorder() {
            let is_request = self.tasks.nodes.get(&task).map(|n| !n.push);
            if is_request != Some(true) {
                continue;
            }
            for (id, erased) in self.tasks.remove(task) {
                failed.push((id, erased));
            }
        }

        for (task, erased) in failed {
            if let Some(erased) = erased {
                debug!("Task {} failed: {}", task, error);
                erased.finish(self, Err(error.clone()));
            }
        }
    }
}
