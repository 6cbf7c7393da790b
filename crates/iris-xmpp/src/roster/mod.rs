// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

pub use event::Event;
pub use item::{Roster, RosterItem, Subscription};
pub use live::{LiveRoster, LiveRosterItem};
pub use resource::{Resource, ResourceList};

mod event;
mod item;
mod live;
mod resource;
