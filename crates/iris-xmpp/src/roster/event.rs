// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use crate::roster::LiveRosterItem;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ItemAdded(LiveRosterItem),
    ItemUpdated(LiveRosterItem),
    ItemRemoved(LiveRosterItem),
}
