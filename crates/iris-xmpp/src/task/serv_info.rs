// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use minidom::{Element, NSChoice};

use crate::client::ClientInfo;
use crate::stanza::{create_iq, ns};
use crate::task::{Task, TaskContext};
use crate::util::ElementExt;

/// Answers software version (XEP-0092) and service discovery info (XEP-0030) requests.
#[derive(Debug, Default)]
pub struct ServInfo {}

impl Task for ServInfo {
    fn is_push(&self) -> bool {
        true
    }

    fn take(&mut self, ctx: &mut TaskContext<'_>, stanza: &Element) -> bool {
        if stanza.name() != "iq" || stanza.attr("type") != Some("get") {
            return false;
        }

        let from = stanza.attr("from").unwrap_or_default();
        let id = stanza.attr("id").unwrap_or_default();

        let reply = match stanza.query_ns().as_deref() {
            Some(ns::VERSION) => version_reply(&ctx.session().info, from, id),
            Some(ns::DISCO_INFO) => {
                let node = stanza
                    .get_child("query", NSChoice::Any)
                    .and_then(|query| query.attr("node"))
                    .unwrap_or_default();
                match disco_info_reply(&ctx.session().info, node, from, id) {
                    Some(reply) => reply,
                    None => item_not_found_reply(stanza),
                }
            }
            _ => return false,
        };

        ctx.send(reply);
        true
    }
}

fn version_reply(info: &ClientInfo, to: &str, id: &str) -> Element {
    let mut iq = create_iq("result", to, id);
    iq.append_child(
        Element::builder("query", ns::VERSION)
            .append(text("name", &info.name))
            .append(text("version", &info.version))
            .append(text("os", &info.os))
            .build(),
    );
    iq
}

/// Returns `None` if `node` is not one we publish.
fn disco_info_reply(info: &ClientInfo, node: &str, to: &str, id: &str) -> Option<Element> {
    let caps_prefix = format!("{}#", info.caps_node);

    let features: Vec<&str> = if node.is_empty() || node == info.caps_node_ver() {
        let mut features: Vec<&str> = info.features().collect();
        if node.is_empty() {
            features.extend(info.extensions.values().flatten().map(String::as_str));
        }
        features
    } else if let Some(ext) = node.strip_prefix(&caps_prefix) {
        info.extensions
            .get(ext)?
            .iter()
            .map(String::as_str)
            .collect()
    } else {
        return None;
    };

    let mut query = Element::builder("query", ns::DISCO_INFO).build();
    if !node.is_empty() {
        query.set_attr("node", node);
    }

    let mut identity = Element::builder("identity", ns::DISCO_INFO)
        .attr("category", info.identity.category.as_str())
        .attr("type", info.identity.type_.as_str())
        .build();
    if !info.identity.name.is_empty() {
        identity.set_attr("name", info.identity.name.as_str());
    }
    query.append_child(identity);

    for feature in features {
        query.append_child(
            Element::builder("feature", ns::DISCO_INFO)
                .attr("var", feature)
                .build(),
        );
    }

    let mut iq = create_iq("result", to, id);
    iq.append_child(query);
    Some(iq)
}

fn item_not_found_reply(request: &Element) -> Element {
    let mut reply = create_iq(
        "error",
        request.attr("from").unwrap_or_default(),
        request.attr("id").unwrap_or_default(),
    );
    for child in request.children() {
        reply.append_child(child.clone());
    }
    reply.append_child(
        Element::builder("error", ns::JABBER_CLIENT)
            .attr("type", "cancel")
            .append(Element::builder("item-not-found", ns::XMPP_STANZAS).build())
            .build(),
    );
    reply
}

fn text(name: &str, text: &str) -> Element {
    Element::builder(name, ns::VERSION).append(text).build()
}
