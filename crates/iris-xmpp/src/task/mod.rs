// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

pub use iq_request::IqRequest;
pub use message::{PushMessage, SendMessage};
pub use presence::{PushPresence, SendPresence};
pub use roster::{PushRoster, RosterTask};
pub use serv_info::ServInfo;
pub use task::{Task, TaskContext, TaskHandle, TaskId, TaskState};
pub(crate) use tree::{OnFinish, TaskSlot, TaskTree};

mod iq_request;
mod message;
mod presence;
mod roster;
mod serv_info;
mod task;
mod tree;
