// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use minidom::Element;

use crate::jid::Jid;
use crate::stanza::iq_verify;
use crate::task::{Task, TaskContext};

/// Sends an arbitrary IQ get/set and completes with the matching reply.
#[derive(Debug, Clone)]
pub struct IqRequest {
    request: Element,
    to: Jid,
    response: Option<Element>,
}

impl IqRequest {
    /// `request` gets the task id assigned as its `id` attribute when the task starts.
    pub fn new(request: Element) -> Self {
        let to = Jid::new(request.attr("to").unwrap_or_default());
        IqRequest {
            request,
            to,
            response: None,
        }
    }

    pub fn response(&self) -> Option<&Element> {
        self.response.as_ref()
    }

    pub fn into_response(self) -> Option<Element> {
        self.response
    }
}

impl Task for IqRequest {
    fn on_go(&mut self, ctx: &mut TaskContext<'_>) {
        self.request.set_attr("id", ctx.id());
        ctx.send(self.request.clone());
    }

    fn take(&mut self, ctx: &mut TaskContext<'_>, stanza: &Element) -> bool {
        if !matches!(stanza.attr("type"), Some("result") | Some("error")) {
            return false;
        }
        if !iq_verify(stanza, ctx.local_jid(), &self.to, ctx.id(), None) {
            return false;
        }

        match stanza.attr("type") {
            Some("result") => {
                self.response = Some(stanza.clone());
                ctx.set_success();
            }
            _ => ctx.set_error_from(stanza),
        }
        true
    }
}
