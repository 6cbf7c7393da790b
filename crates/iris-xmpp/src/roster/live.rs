// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use std::ops::Deref;

use crate::jid::Jid;
use crate::roster::{ResourceList, RosterItem};
use crate::stanza::Status;

/// A roster entry together with its presence state.
///
/// The item is available exactly when at least one resource is online.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveRosterItem {
    item: RosterItem,
    pub resources: ResourceList,
    pub last_unavailable_status: Status,
    pub flag_for_delete: bool,
}

impl LiveRosterItem {
    pub fn new(item: RosterItem) -> Self {
        LiveRosterItem {
            item,
            resources: ResourceList::default(),
            last_unavailable_status: Status::unavailable(),
            flag_for_delete: false,
        }
    }

    pub fn roster_item(&self) -> &RosterItem {
        &self.item
    }

    /// Replaces the server-side part, keeping the presence state.
    pub fn set_roster_item(&mut self, item: RosterItem) {
        self.item = item
    }

    pub fn is_available(&self) -> bool {
        !self.resources.is_empty()
    }
}

impl Deref for LiveRosterItem {
    type Target = RosterItem;

    fn deref(&self) -> &Self::Target {
        &self.item
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveRoster(Vec<LiveRosterItem>);

impl LiveRoster {
    pub fn find(&self, jid: &Jid) -> Option<&LiveRosterItem> {
        self.0.iter().find(|i| i.jid == *jid)
    }

    pub fn find_mut(&mut self, jid: &Jid) -> Option<&mut LiveRosterItem> {
        self.0.iter_mut().find(|i| i.jid == *jid)
    }

    pub fn push(&mut self, item: LiveRosterItem) {
        self.0.push(item)
    }

    pub fn remove(&mut self, jid: &Jid) -> Option<LiveRosterItem> {
        let idx = self.0.iter().position(|i| i.jid == *jid)?;
        Some(self.0.remove(idx))
    }

    pub fn flag_all_for_delete(&mut self) {
        for item in self.0.iter_mut() {
            item.flag_for_delete = true;
        }
    }

    /// Removes and returns every item still flagged for deletion, in roster order.
    pub fn sweep_flagged(&mut self) -> Vec<LiveRosterItem> {
        let (flagged, kept) = std::mem::take(&mut self.0)
            .into_iter()
            .partition(|i| i.flag_for_delete);
        self.0 = kept;
        flagged
    }

    pub fn clear(&mut self) {
        self.0.clear()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LiveRosterItem> {
        self.0.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut LiveRosterItem> {
        self.0.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
