// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use chrono::{DateTime, NaiveDateTime, Utc};
use minidom::{Element, NSChoice};
use strum_macros::{Display, EnumString};

use crate::jid::Jid;
use crate::stanza::{ns, StanzaFault};
use crate::util::ElementExt;

/// Coarse availability derived from a [`Status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum StatusType {
    Offline,
    Online,
    Away,
    XA,
    DND,
    Invisible,
    #[strum(serialize = "chat")]
    FFC,
}

/// The `type` of a subscription management presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SubscriptionKind {
    Subscribe,
    Subscribed,
    Unsubscribe,
    Unsubscribed,
}

/// XEP-0045 history limits sent with a join. Unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MucHistory {
    pub max_chars: Option<u32>,
    pub max_stanzas: Option<u32>,
    pub seconds: Option<u32>,
}

impl MucHistory {
    pub fn is_empty(&self) -> bool {
        self.max_chars.is_none() && self.max_stanzas.is_none() && self.seconds.is_none()
    }
}

/// The `<x xmlns='http://jabber.org/protocol/muc'/>` payload of a join presence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MucJoin {
    pub password: Option<String>,
    pub history: MucHistory,
}

/// An `<item/>` of a `muc#user` presence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MucItem {
    pub nick: Option<String>,
    pub jid: Option<Jid>,
    pub affiliation: Option<String>,
    pub role: Option<String>,
    pub actor: Option<Jid>,
    pub reason: Option<String>,
}

impl MucItem {
    fn from_element(element: &Element) -> Self {
        MucItem {
            nick: element.attr("nick").map(ToString::to_string),
            jid: element.attr("jid").map(Jid::new),
            affiliation: element.attr("affiliation").map(ToString::to_string),
            role: element.attr("role").map(ToString::to_string),
            actor: element
                .get_child("actor", NSChoice::Any)
                .and_then(|actor| actor.attr("jid"))
                .map(Jid::new),
            reason: element.child_text("reason"),
        }
    }
}

/// A `<destroy/>` notice of a `muc#user` presence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MucDestroy {
    pub jid: Option<Jid>,
    pub reason: Option<String>,
}

/// Availability of one resource, as announced by a `<presence/>` stanza.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub show: String,
    pub status: String,
    pub priority: i32,
    pub timestamp: DateTime<Utc>,
    pub available: bool,
    pub invisible: bool,
    pub error: Option<StanzaFault>,
    pub key_id: String,
    pub xsigned: String,
    pub caps_node: String,
    pub caps_version: String,
    pub caps_ext: String,
    pub photo_hash: Option<String>,
    pub muc: Option<MucJoin>,
    pub muc_item: Option<MucItem>,
    pub muc_status: Vec<u16>,
    pub muc_destroy: Option<MucDestroy>,
}

impl Default for Status {
    fn default() -> Self {
        Status::new("", "", 0, true)
    }
}

impl Status {
    pub fn new(show: &str, status: &str, priority: i32, available: bool) -> Self {
        Status {
            show: show.to_string(),
            status: status.to_string(),
            priority,
            timestamp: Utc::now(),
            available,
            invisible: false,
            error: None,
            key_id: String::new(),
            xsigned: String::new(),
            caps_node: String::new(),
            caps_version: String::new(),
            caps_ext: String::new(),
            photo_hash: None,
            muc: None,
            muc_item: None,
            muc_status: vec![],
            muc_destroy: None,
        }
    }

    pub fn unavailable() -> Self {
        Status::new("", "", 0, false)
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_type(type_: StatusType) -> Self {
        let mut status = Status::default();
        status.set_type(type_);
        status
    }

    pub fn set_type(&mut self, type_: StatusType) {
        self.available = type_ != StatusType::Offline;
        self.invisible = type_ == StatusType::Invisible;
        self.show = match type_ {
            StatusType::Away => "away",
            StatusType::FFC => "chat",
            StatusType::XA => "xa",
            StatusType::DND => "dnd",
            StatusType::Offline | StatusType::Online | StatusType::Invisible => "",
        }
        .to_string();
    }

    pub fn status_type(&self) -> StatusType {
        if !self.available {
            return StatusType::Offline;
        }
        if self.invisible {
            return StatusType::Invisible;
        }
        match self.show.as_str() {
            "away" => StatusType::Away,
            "xa" => StatusType::XA,
            "dnd" => StatusType::DND,
            "chat" => StatusType::FFC,
            _ => StatusType::Online,
        }
    }

    pub fn is_away(&self) -> bool {
        matches!(self.show.as_str(), "away" | "xa" | "dnd")
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_muc(&self) -> bool {
        self.muc.is_some()
    }

    /// Reads everything but the `type` attribute of an incoming presence. `now` is used when the
    /// stanza carries no delay information.
    pub fn from_presence(presence: &Element, now: DateTime<Utc>) -> Self {
        let mut status = Status::new("", "", 0, true);
        status.timestamp = now;

        match presence.attr("type") {
            Some("unavailable") => status.available = false,
            Some("error") => {
                status.error = Some(StanzaFault::from_stanza(presence).unwrap_or(StanzaFault {
                    code: 0,
                    condition: None,
                    text: String::new(),
                }))
            }
            _ => (),
        }

        if let Some(text) = presence.child_text("status") {
            status.status = text;
        }
        if let Some(show) = presence.child_text("show") {
            status.show = show;
        }
        if let Some(priority) = presence.child_text("priority") {
            status.priority = priority.trim().parse().unwrap_or(0);
        }

        for child in presence.children() {
            match (child.name(), child.ns().as_str()) {
                ("delay", ns::DELAY) | ("x", ns::LEGACY_DELAY) => {
                    if let Some(stamp) = child.attr("stamp").and_then(parse_stamp) {
                        status.timestamp = stamp;
                    }
                }
                ("x", ns::SIGNED) => status.xsigned = child.text(),
                ("x", ns::E2E) => status.key_id = child.text(),
                ("c", ns::CAPS) => {
                    status.caps_node = child.attr("node").unwrap_or_default().to_string();
                    status.caps_version = child.attr("ver").unwrap_or_default().to_string();
                    status.caps_ext = child.attr("ext").unwrap_or_default().to_string();
                }
                ("x", ns::VCARD_UPDATE) => {
                    status.photo_hash = Some(child.child_text("photo").unwrap_or_default())
                }
                ("x", ns::MUC_USER) => status.read_muc_user(child),
                _ => (),
            }
        }

        status
    }

    fn read_muc_user(&mut self, x: &Element) {
        for child in x.children() {
            match child.name() {
                "item" => self.muc_item = Some(MucItem::from_element(child)),
                "status" => {
                    if let Some(code) = child.attr("code").and_then(|c| c.parse().ok()) {
                        self.muc_status.push(code)
                    }
                }
                "destroy" => {
                    self.muc_destroy = Some(MucDestroy {
                        jid: child.attr("jid").map(Jid::new),
                        reason: child.child_text("reason"),
                    })
                }
                _ => (),
            }
        }
    }

    /// Builds the outgoing `<presence/>` announcing this status, optionally directed at `to`.
    pub fn to_presence(&self, to: Option<&Jid>) -> Element {
        let mut presence = Element::builder("presence", ns::JABBER_CLIENT).build();
        if let Some(to) = to {
            presence.set_attr("to", to.full());
        }

        if !self.available {
            presence.set_attr("type", "unavailable");
            if !self.status.is_empty() {
                presence.append_child(text_element("status", &self.status));
            }
            return presence;
        }

        if self.invisible {
            presence.set_attr("type", "invisible");
        }
        if !self.show.is_empty() {
            presence.append_child(text_element("show", &self.show));
        }
        if !self.status.is_empty() {
            presence.append_child(text_element("status", &self.status));
        }
        presence.append_child(text_element("priority", &self.priority.to_string()));

        if !self.key_id.is_empty() {
            presence.append_child(Element::builder("x", ns::E2E).append(self.key_id.as_str()).build());
        }
        if !self.xsigned.is_empty() {
            presence
                .append_child(Element::builder("x", ns::SIGNED).append(self.xsigned.as_str()).build());
        }

        if !self.caps_node.is_empty() && !self.caps_version.is_empty() {
            let mut c = Element::builder("c", ns::CAPS)
                .attr("node", self.caps_node.as_str())
                .attr("ver", self.caps_version.as_str())
                .build();
            if !self.caps_ext.is_empty() {
                c.set_attr("ext", self.caps_ext.as_str());
            }
            presence.append_child(c);
        }

        if let Some(muc) = &self.muc {
            presence.append_child(muc_join_element(muc));
        }

        if let Some(photo_hash) = &self.photo_hash {
            presence.append_child(
                Element::builder("x", ns::VCARD_UPDATE)
                    .append(
                        Element::builder("photo", ns::VCARD_UPDATE)
                            .append(photo_hash.as_str())
                            .build(),
                    )
                    .build(),
            );
        }

        presence
    }
}

fn muc_join_element(muc: &MucJoin) -> Element {
    let mut x = Element::builder("x", ns::MUC).build();
    if let Some(password) = muc.password.as_deref().filter(|p| !p.is_empty()) {
        x.append_child(
            Element::builder("password", ns::MUC)
                .append(password)
                .build(),
        );
    }
    if !muc.history.is_empty() {
        x.append_child(
            Element::builder("history", ns::MUC)
                .attr("maxchars", muc.history.max_chars)
                .attr("maxstanzas", muc.history.max_stanzas)
                .attr("seconds", muc.history.seconds)
                .build(),
        );
    }
    x
}

fn text_element(name: &str, text: &str) -> Element {
    Element::builder(name, ns::JABBER_CLIENT)
        .append(text)
        .build()
}

/// Parses both the XEP-0082 form (`2002-09-10T23:08:25Z`) and the legacy XEP-0091 form
/// (`20020910T23:08:25`, always UTC).
pub(crate) fn parse_stamp(stamp: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(stamp) {
        return Some(date.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(stamp, "%Y%m%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
