// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Generates the `id` attribute of outbound stanzas. Ids must never repeat for the lifetime of a
/// connection.
pub trait IDProvider: Send + Sync {
    fn new_id(&self) -> String;
}

/// Monotonic counter rendered as `a` followed by the lowercase hex value. Starts at `0xaaaa` and
/// advances by `0x10` per id, so the first ids are `aaaaa`, `aaaba`, `aaaca`…
pub struct SeededIDProvider {
    next: AtomicU64,
}

impl SeededIDProvider {
    pub const DEFAULT_SEED: u64 = 0xaaaa;
    const STEP: u64 = 0x10;

    pub fn new() -> Self {
        Self::with_seed(Self::DEFAULT_SEED)
    }

    pub fn with_seed(seed: u64) -> Self {
        SeededIDProvider {
            next: AtomicU64::new(seed),
        }
    }
}

impl Default for SeededIDProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl IDProvider for SeededIDProvider {
    fn new_id(&self) -> String {
        let value = self.next.fetch_add(Self::STEP, Ordering::Relaxed);
        format!("a{:x}", value)
    }
}

impl IDProvider for Arc<dyn IDProvider> {
    fn new_id(&self) -> String {
        self.deref().new_id()
    }
}

/// Source of "now" for presence timestamps that carry no delay information.
pub trait TimeProvider: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Default)]
pub struct SystemTimeProvider {}

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl TimeProvider for Arc<dyn TimeProvider> {
    fn now(&self) -> DateTime<Utc> {
        self.deref().now()
    }
}
