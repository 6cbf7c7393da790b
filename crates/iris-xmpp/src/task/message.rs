// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use minidom::Element;

use crate::stanza::Message;
use crate::task::{Task, TaskContext};

/// Sends a message. A message without id gets the task's id.
#[derive(Debug, Clone)]
pub struct SendMessage {
    message: Message,
}

impl SendMessage {
    pub fn new(message: Message) -> Self {
        SendMessage { message }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }
}

impl Task for SendMessage {
    fn on_go(&mut self, ctx: &mut TaskContext<'_>) {
        if self.message.id.is_empty() {
            self.message.id = ctx.id().to_string();
        }
        ctx.send(Element::from(&self.message));
        ctx.set_success();
    }
}

#[derive(Debug, Default)]
pub struct PushMessage {}

impl Task for PushMessage {
    fn is_push(&self) -> bool {
        true
    }

    fn take(&mut self, ctx: &mut TaskContext<'_>, stanza: &Element) -> bool {
        if stanza.name() != "message" {
            return false;
        }
        ctx.session().pm_message(Message::from(stanza));
        true
    }
}
