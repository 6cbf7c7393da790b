// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use minidom::Element;

use crate::jid::Jid;
use crate::stanza::ns;
use crate::util::ElementExt;

/// Builds an empty `<iq/>` of the given type. Empty `to`/`id` are omitted.
pub fn create_iq(type_: &str, to: &str, id: &str) -> Element {
    let mut iq = Element::builder("iq", ns::JABBER_CLIENT)
        .attr("type", type_)
        .build();
    if !to.is_empty() {
        iq.set_attr("to", to);
    }
    if !id.is_empty() {
        iq.set_attr("id", id);
    }
    iq
}

/// Builds `<iq type=…><query xmlns=…/></iq>`.
pub fn create_query_iq(type_: &str, to: &str, id: &str, query_ns: &str) -> Element {
    let mut iq = create_iq(type_, to, id);
    iq.append_child(Element::builder("query", query_ns).build());
    iq
}

/// Checks whether the IQ `stanza` is a plausible reply to a request sent to `to` with the given
/// `id`, optionally requiring the namespace of its query.
///
/// The `from` rules: a reply without `from` is only accepted if we addressed our server (or
/// nobody). A reply from our own account or our server is accepted if we addressed ourselves,
/// our server, or nobody. Anything else must come from exactly the address we queried.
pub fn iq_verify(stanza: &Element, local: &Jid, to: &Jid, id: &str, xmlns: Option<&str>) -> bool {
    if stanza.name() != "iq" {
        return false;
    }

    let server = local.to_domain();
    let from = Jid::new(stanza.attr("from").unwrap_or_default());

    if from.is_empty() {
        if !to.is_empty() && !to.compare(&server, true) {
            return false;
        }
    } else if from.compare(local, false) || from.compare(&server, false) {
        if !to.is_empty() && !to.compare(local, false) && !to.compare(&server, true) {
            return false;
        }
    } else if !from.compare(to, true) {
        return false;
    }

    if !id.is_empty() && stanza.attr("id") != Some(id) {
        return false;
    }

    if let Some(xmlns) = xmlns {
        if stanza.query_ns().as_deref() != Some(xmlns) {
            return false;
        }
    }

    true
}

/// The mandatory answer to a request nobody handled: an error IQ echoing the request's children
/// followed by `<error type='cancel'><feature-not-implemented/></error>`.
pub fn feature_not_implemented_reply(request: &Element) -> Element {
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
            .append(Element::builder("feature-not-implemented", ns::XMPP_STANZAS).build())
            .build(),
    );

    reply
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn iq(from: Option<&str>, id: &str) -> Element {
        let mut iq = create_query_iq("result", "", id, ns::ROSTER);
        if let Some(from) = from {
            iq.set_attr("from", from);
        }
        iq
    }

    #[test]
    fn test_iq_verify_from_rules() {
        let local = Jid::new("me@example.org/psi");
        let server = Jid::new("example.org");
        let nobody = Jid::default();
        let peer = Jid::new("peer@example.org/home");

        assert!(iq_verify(&iq(None, "a1"), &local, &nobody, "a1", None));
        assert!(iq_verify(&iq(None, "a1"), &local, &server, "a1", None));
        assert!(!iq_verify(&iq(None, "a1"), &local, &peer, "a1", None));

        assert!(iq_verify(&iq(Some("me@example.org"), "a1"), &local, &nobody, "a1", None));
        assert!(iq_verify(&iq(Some("example.org"), "a1"), &local, &server, "a1", None));
        assert!(!iq_verify(&iq(Some("example.org"), "a1"), &local, &peer, "a1", None));

        assert!(iq_verify(&iq(Some("peer@example.org/home"), "a1"), &local, &peer, "a1", None));
        assert!(!iq_verify(&iq(Some("peer@example.org/work"), "a1"), &local, &peer, "a1", None));
        assert!(!iq_verify(&iq(Some("evil@example.org"), "a1"), &local, &nobody, "a1", None));
    }

    #[test]
    fn test_iq_verify_id_and_namespace() {
        let local = Jid::new("me@example.org/psi");
        let nobody = Jid::default();

        assert!(!iq_verify(&iq(None, "a2"), &local, &nobody, "a1", None));
        assert!(iq_verify(&iq(None, "a2"), &local, &nobody, "", Some(ns::ROSTER)));
        assert!(!iq_verify(&iq(None, "a2"), &local, &nobody, "", Some(ns::VERSION)));
    }

    #[test]
    fn test_feature_not_implemented_reply() {
        let request = Element::from_str(
            r#"<iq xmlns="jabber:client" type="get" id="q1" from="peer@example.org/home"><query xmlns="jabber:iq:last"/></iq>"#,
        )
        .unwrap();

        let reply = feature_not_implemented_reply(&request);

        assert_eq!(reply.attr("type"), Some("error"));
        assert_eq!(reply.attr("to"), Some("peer@example.org/home"));
        assert_eq!(reply.attr("id"), Some("q1"));
        assert!(reply.get_child("query", "jabber:iq:last").is_some());
        let error = reply.get_child("error", ns::JABBER_CLIENT).unwrap();
        assert_eq!(error.attr("type"), Some("cancel"));
        assert!(error
            .get_child("feature-not-implemented", ns::XMPP_STANZAS)
            .is_some());
    }
}
