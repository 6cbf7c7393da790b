// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use minidom::{Element, Node};
use parking_lot::Mutex;

pub use connected_client::{ClientTestAdditions, ConnectedClient};
pub use connector::{Connection, Connector};

use crate::{IDProvider, Jid, TimeProvider};


/// Installs a `tracing` subscriber writing to the test output. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

/// Numbers stanza ids `<prefix>-1`, `<prefix>-2` and so on. The fixture resets it after
/// connecting, so the first id a test sees is always `<prefix>-1`.
pub struct IncrementingIDProvider {
    prefix: String,
    counter: Mutex<u64>,
}

impl IncrementingIDProvider {
    pub fn new(prefix: &str) -> Self {
        IncrementingIDProvider {
            prefix: prefix.to_string(),
            counter: Mutex::new(0),
        }
    }

    pub fn reset(&self) {
        *self.counter.lock() = 0;
    }
}

impl IDProvider for IncrementingIDProvider {
    fn new_id(&self) -> String {
        let mut counter = self.counter.lock();
        *counter += 1;
        format!("{}-{}", self.prefix, *counter)
    }
}

/// Always returns the same instant, 2023-01-01 12:00 UTC unless specified otherwise.
pub struct ConstantTimeProvider {
    pub time: DateTime<Utc>,
}

impl ConstantTimeProvider {
    pub fn default_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }
}

impl Default for ConstantTimeProvider {
    fn default() -> Self {
        ConstantTimeProvider {
            time: Self::default_time(),
        }
    }
}

impl TimeProvider for ConstantTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

pub trait ElementTestAdditions {
    /// Parses indented XML, ignoring whitespace between elements.
    fn from_pretty_printed_xml(xml: &str) -> Result<Element>;
}

impl ElementTestAdditions for Element {
    fn from_pretty_printed_xml(xml: &str) -> Result<Element> {
        Ok(strip_whitespace(&Element::from_str(xml)?))
    }
}

fn strip_whitespace(element: &Element) -> Element {
    let mut builder = Element::builder(element.name(), element.ns());
    for (name, value) in element.attrs() {
        builder = builder.attr(name, value);
    }
    for node in element.nodes() {
        builder = match node {
            Node::Element(child) => builder.append(strip_whitespace(child)),
            Node::Text(text) if text.trim().is_empty() => builder,
            other => builder.append(other.clone()),
        };
    }
    builder.build()
}

#[macro_export]
macro_rules! jid {
    ($jid:expr) => {
        $jid.parse::<$crate::Jid>().unwrap()
    };
}

pub trait JidTestAdditions {
    fn ours() -> Jid;
    fn theirs() -> Jid;
}

impl JidTestAdditions for Jid {
    fn ours() -> Jid {
        Jid::from_str("test@iris.org").unwrap_or_default()
    }

    fn theirs() -> Jid {
        Jid::from_str("friend@iris.org").unwrap_or_default()
    }
}
