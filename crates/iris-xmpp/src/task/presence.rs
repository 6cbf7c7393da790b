// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use minidom::Element;

use crate::jid::Jid;
use crate::stanza::{ns, Status, SubscriptionKind};
use crate::task::{Task, TaskContext};
use crate::util::ElementExt;

/// Sends one presence stanza and succeeds right away.
#[derive(Debug, Clone)]
pub struct SendPresence {
    presence: Element,
}

impl SendPresence {
    /// Broadcasts `status`, or directs it at `to`.
    pub fn new(status: &Status, to: Option<&Jid>) -> Self {
        SendPresence {
            presence: status.to_presence(to),
        }
    }

    /// A subscription request or answer, optionally announcing our nickname.
    pub fn subscription(to: &Jid, kind: SubscriptionKind, nick: Option<&str>) -> Self {
        let mut presence = Element::builder("presence", ns::JABBER_CLIENT)
            .attr("to", to.full())
            .attr("type", kind.to_string())
            .build();
        if let Some(nick) = nick.filter(|nick| !nick.is_empty()) {
            presence.append_child(Element::builder("nick", ns::NICK).append(nick).build());
        }
        SendPresence { presence }
    }
}

impl Task for SendPresence {
    fn on_go(&mut self, ctx: &mut TaskContext<'_>) {
        ctx.send(self.presence.clone());
        ctx.set_success();
    }
}

/// Receives every presence stanza and feeds it to the roster and group chat bookkeeping.
#[derive(Debug, Default)]
pub struct PushPresence {}

impl Task for PushPresence {
    fn is_push(&self) -> bool {
        true
    }

    fn take(&mut self, ctx: &mut TaskContext<'_>, stanza: &Element) -> bool {
        if stanza.name() != "presence" {
            return false;
        }

        let from = Jid::new(stanza.attr("from").unwrap_or_default());

        if let Some(kind) = stanza
            .attr("type")
            .and_then(|t| t.parse::<SubscriptionKind>().ok())
        {
            let nick = stanza
                .get_child("nick", ns::NICK)
                .and_then(|nick| nick.non_empty_text());
            ctx.session().pp_subscription(from, kind, nick);
            return true;
        }

        let now = ctx.session().now();
        let status = Status::from_presence(stanza, now);
        ctx.session().pp_presence(&from, status);
        true
    }
}
