// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use minidom::{Element, NSChoice};

use crate::jid::Jid;
use crate::roster::{Roster, Subscription};
use crate::stanza::{create_iq, create_query_iq, iq_verify, ns};
use crate::task::{Task, TaskContext};

#[derive(Debug, Clone, PartialEq)]
enum RosterRequest {
    Get,
    Set(Vec<Element>),
}

/// Fetches the roster or changes items in it (`jabber:iq:roster`).
#[derive(Debug, Clone)]
pub struct RosterTask {
    request: RosterRequest,
    roster: Roster,
}

impl RosterTask {
    pub fn get() -> Self {
        RosterTask {
            request: RosterRequest::Get,
            roster: Roster::default(),
        }
    }

    /// Adds or updates one item. An empty name is omitted.
    pub fn set(jid: &Jid, name: &str, groups: &[String]) -> Self {
        let mut item = Element::builder("item", ns::ROSTER)
            .attr("jid", jid.full())
            .build();
        if !name.is_empty() {
            item.set_attr("name", name);
        }
        for group in groups {
            item.append_child(
                Element::builder("group", ns::ROSTER)
                    .append(group.as_str())
                    .build(),
            );
        }
        RosterTask {
            request: RosterRequest::Set(vec![item]),
            roster: Roster::default(),
        }
    }

    pub fn remove(jid: &Jid) -> Self {
        let item = Element::builder("item", ns::ROSTER)
            .attr("jid", jid.full())
            .attr("subscription", Subscription::Remove.to_string())
            .build();
        RosterTask {
            request: RosterRequest::Set(vec![item]),
            roster: Roster::default(),
        }
    }

    /// The roster received in reply to a `get`.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn into_roster(self) -> Roster {
        self.roster
    }
}

impl Task for RosterTask {
    fn on_go(&mut self, ctx: &mut TaskContext<'_>) {
        let iq = match &self.request {
            RosterRequest::Get => create_query_iq("get", "", ctx.id(), ns::ROSTER),
            RosterRequest::Set(items) => {
                let mut iq = create_iq("set", "", ctx.id());
                let mut query = Element::builder("query", ns::ROSTER).build();
                for item in items {
                    query.append_child(item.clone());
                }
                iq.append_child(query);
                iq
            }
        };
        ctx.send(iq);
    }

    fn take(&mut self, ctx: &mut TaskContext<'_>, stanza: &Element) -> bool {
        if !matches!(stanza.attr("type"), Some("result") | Some("error")) {
            return false;
        }
        if !iq_verify(stanza, ctx.local_jid(), &ctx.host(), ctx.id(), None) {
            return false;
        }

        if stanza.attr("type") != Some("result") {
            ctx.set_error_from(stanza);
            return true;
        }

        if self.request == RosterRequest::Get {
            if let Some(query) = stanza.get_child("query", NSChoice::Any) {
                self.roster = Roster::from_query(query, false);
            }
        }
        ctx.set_success();
        true
    }
}

/// Applies roster pushes and acknowledges them.
///
/// Only pushes from our own account or our server are accepted.
#[derive(Debug, Default)]
pub struct PushRoster {}

impl Task for PushRoster {
    fn is_push(&self) -> bool {
        true
    }

    fn take(&mut self, ctx: &mut TaskContext<'_>, stanza: &Element) -> bool {
        if stanza.name() != "iq" || stanza.attr("type") != Some("set") {
            return false;
        }
        if !iq_verify(stanza, ctx.local_jid(), &ctx.host(), "", Some(ns::ROSTER)) {
            return false;
        }

        let roster = stanza
            .get_child("query", ns::ROSTER)
            .map(|query| Roster::from_query(query, true))
            .unwrap_or_default();
        ctx.session().import_roster(roster);

        ctx.send(create_iq(
            "result",
            stanza.attr("from").unwrap_or_default(),
            stanza.attr("id").unwrap_or_default(),
        ));
        true
    }
}
