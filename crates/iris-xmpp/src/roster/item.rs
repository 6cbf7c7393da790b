// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use minidom::Element;
use strum_macros::{Display, EnumString};

use crate::jid::Jid;
use crate::stanza::ns;
use crate::util::{ElementExt, ParseError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Subscription {
    #[default]
    None,
    To,
    From,
    Both,
    Remove,
}

impl Subscription {
    /// Arrow notation used in roster debug output.
    pub(crate) fn arrows(&self) -> &'static str {
        match self {
            Subscription::Both => "<-->",
            Subscription::From => "  ->",
            Subscription::To => "<-  ",
            Subscription::Remove => "xxxx",
            Subscription::None => "----",
        }
    }
}

/// A server-side roster entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterItem {
    pub jid: Jid,
    pub name: String,
    pub groups: Vec<String>,
    pub subscription: Subscription,
    pub ask: String,
    pub is_push: bool,
}

impl RosterItem {
    pub fn new(jid: Jid) -> Self {
        RosterItem {
            jid,
            ..Default::default()
        }
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// Returns false if the item already was in `group`.
    pub fn add_group(&mut self, group: impl Into<String>) -> bool {
        let group = group.into();
        if self.in_group(&group) {
            return false;
        }
        self.groups.push(group);
        true
    }

    pub fn remove_group(&mut self, group: &str) -> bool {
        let Some(idx) = self.groups.iter().position(|g| g == group) else {
            return false;
        };
        self.groups.remove(idx);
        true
    }

    pub fn from_xml(item: &Element) -> Result<Self, ParseError> {
        if item.name() != "item" {
            return Err(ParseError::Generic {
                msg: format!("Expected roster item. Got {} instead.", item.name()),
            });
        }

        let jid = Jid::new(item.attr_req("jid")?);
        if !jid.is_valid() {
            return Err(ParseError::Generic {
                msg: format!("Invalid roster item jid {}.", item.attr("jid").unwrap_or_default()),
            });
        }

        let subscription = item
            .attr("subscription")
            .unwrap_or("none")
            .parse()
            .map_err(|_| ParseError::Generic {
                msg: format!(
                    "Unknown subscription {}.",
                    item.attr("subscription").unwrap_or_default()
                ),
            })?;

        Ok(RosterItem {
            jid,
            name: item.attr("name").unwrap_or_default().to_string(),
            groups: item
                .children()
                .filter(|child| child.name() == "group")
                .map(Element::text)
                .collect(),
            subscription,
            ask: item.attr("ask").unwrap_or_default().to_string(),
            is_push: false,
        })
    }

    pub fn to_xml(&self) -> Element {
        let mut item = Element::builder("item", ns::ROSTER)
            .attr("jid", self.jid.full())
            .attr("name", self.name.as_str())
            .attr("subscription", self.subscription.to_string())
            .build();
        if !self.ask.is_empty() {
            item.set_attr("ask", self.ask.as_str());
        }
        for group in &self.groups {
            item.append_child(
                Element::builder("group", ns::ROSTER)
                    .append(group.as_str())
                    .build(),
            );
        }
        item
    }
}

/// An ordered list of roster items, as carried by a roster result or push.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    pub items: Vec<RosterItem>,
}

impl Roster {
    pub fn find(&self, jid: &Jid) -> Option<&RosterItem> {
        self.items.iter().find(|item| item.jid == *jid)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Reads every well-formed `<item/>` of a `jabber:iq:roster` query. Malformed items are
    /// skipped.
    pub fn from_query(query: &Element, is_push: bool) -> Self {
        let items = query
            .children()
            .filter_map(|child| RosterItem::from_xml(child).ok())
            .map(|mut item| {
                item.is_push = is_push;
                item
            })
            .collect();
        Roster { items }
    }
}

impl FromIterator<RosterItem> for Roster {
    fn from_iter<T: IntoIterator<Item = RosterItem>>(iter: T) -> Self {
        Roster {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Roster {
    type Item = RosterItem;
    type IntoIter = std::vec::IntoIter<RosterItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
