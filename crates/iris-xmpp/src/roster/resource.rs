// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use crate::stanza::Status;

/// One live connection of a contact (or of ourselves).
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub name: String,
    pub status: Status,
}

impl Resource {
    pub fn new(name: impl Into<String>, status: Status) -> Self {
        Resource {
            name: name.into(),
            status,
        }
    }

    pub fn priority(&self) -> i32 {
        self.status.priority
    }
}

/// Resources in the order they were discovered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceList(Vec<Resource>);

impl ResourceList {
    pub fn find(&self, name: &str) -> Option<&Resource> {
        self.0.iter().find(|r| r.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Resource> {
        self.0.iter_mut().find(|r| r.name == name)
    }

    /// The resource with the greatest priority. Ties go to the one discovered first.
    pub fn priority(&self) -> Option<&Resource> {
        self.0.iter().fold(None, |highest, r| match highest {
            Some(h) if h.priority() >= r.priority() => Some(h),
            _ => Some(r),
        })
    }

    pub fn push(&mut self, resource: Resource) {
        self.0.push(resource)
    }

    pub fn remove(&mut self, name: &str) -> Option<Resource> {
        let idx = self.0.iter().position(|r| r.name == name)?;
        Some(self.0.remove(idx))
    }

    pub fn clear(&mut self) {
        self.0.clear()
    }

    /// Removes every resource, in discovery order.
    pub fn drain(&mut self) -> impl Iterator<Item = Resource> + '_ {
        self.0.drain(..)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
