// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use chrono::{DateTime, Utc};
use minidom::Element;
use strum_macros::{Display, EnumString};

use crate::jid::Jid;
use crate::stanza::status::parse_stamp;
use crate::stanza::{ns, StanzaFault};
use crate::util::ElementExt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum MessageType {
    #[default]
    Normal,
    Chat,
    Groupchat,
    Headline,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub to: Jid,
    pub from: Jid,
    pub id: String,
    pub type_: MessageType,
    pub body: String,
    pub subject: String,
    pub thread: String,
    /// Set when the message was delayed (offline storage, room history).
    pub timestamp: Option<DateTime<Utc>>,
    pub error: Option<StanzaFault>,
}

impl Message {
    pub fn new(to: Jid) -> Self {
        Message {
            to,
            ..Default::default()
        }
    }

    pub fn chat(to: Jid, body: impl Into<String>) -> Self {
        Message {
            to,
            type_: MessageType::Chat,
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn is_groupchat(&self) -> bool {
        self.type_ == MessageType::Groupchat
    }

    pub fn is_delayed(&self) -> bool {
        self.timestamp.is_some()
    }
}

impl From<&Element> for Message {
    fn from(element: &Element) -> Self {
        let mut message = Message {
            to: element.attr("to").map(Jid::new).unwrap_or_default(),
            from: element.attr("from").map(Jid::new).unwrap_or_default(),
            id: element.attr("id").unwrap_or_default().to_string(),
            type_: element
                .attr("type")
                .and_then(|t| t.parse().ok())
                .unwrap_or_default(),
            body: element.child_text("body").unwrap_or_default(),
            subject: element.child_text("subject").unwrap_or_default(),
            thread: element.child_text("thread").unwrap_or_default(),
            timestamp: None,
            error: None,
        };

        if message.type_ == MessageType::Error {
            message.error = StanzaFault::from_stanza(element);
        }

        for child in element.children() {
            match (child.name(), child.ns().as_str()) {
                ("delay", ns::DELAY) | ("x", ns::LEGACY_DELAY) => {
                    if let Some(stamp) = child.attr("stamp").and_then(parse_stamp) {
                        message.timestamp = Some(stamp)
                    }
                }
                _ => (),
            }
        }

        message
    }
}

impl From<&Message> for Element {
    fn from(message: &Message) -> Self {
        let mut element = Element::builder("message", ns::JABBER_CLIENT).build();
        if !message.to.is_empty() {
            element.set_attr("to", message.to.full());
        }
        if !message.id.is_empty() {
            element.set_attr("id", message.id.as_str());
        }
        if message.type_ != MessageType::Normal {
            element.set_attr("type", message.type_.to_string());
        }

        for (name, text) in [
            ("subject", &message.subject),
            ("body", &message.body),
            ("thread", &message.thread),
        ] {
            if !text.is_empty() {
                element.append_child(
                    Element::builder(name, ns::JABBER_CLIENT)
                        .append(text.as_str())
                        .build(),
                );
            }
        }

        element
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_parses_delayed_groupchat_message() {
        let element = Element::from_str(
            r#"<message xmlns="jabber:client" from="room@conf.example.org/alice" type="groupchat" id="m1">
                <subject>Topic</subject>
                <body>Hello</body>
                <delay xmlns="urn:xmpp:delay" stamp="2023-05-01T10:00:00Z"/>
            </message>"#,
        )
        .unwrap();

        let message = Message::from(&element);

        assert_eq!(message.from, Jid::new("room@conf.example.org/alice"));
        assert_eq!(message.type_, MessageType::Groupchat);
        assert_eq!(message.body, "Hello");
        assert_eq!(message.subject, "Topic");
        assert_eq!(
            message.timestamp,
            Some(Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap())
        );
        assert!(message.error.is_none());
    }

    #[test]
    fn test_builds_chat_message() {
        let mut message = Message::chat(Jid::new("a@b/phone"), "Hi");
        message.id = "a1".to_string();

        let element = Element::from(&message);

        assert_eq!(element.attr("to"), Some("a@b/phone"));
        assert_eq!(element.attr("type"), Some("chat"));
        assert_eq!(element.attr("id"), Some("a1"));
        assert_eq!(element.child_text("body").as_deref(), Some("Hi"));
        assert_eq!(element.child_text("subject"), None);
    }
}
