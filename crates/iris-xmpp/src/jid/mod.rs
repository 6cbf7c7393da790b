// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

pub use error::JidError;

mod error;

const MAX_PART_LEN: usize = 1023;

/// Characters a localpart may never contain (RFC 7622, section 3.3.1 plus the separators).
const FORBIDDEN_NODE_CHARS: &[char] = &['"', '&', '\'', '/', ':', '<', '>', '@'];

/// An XMPP address of the form `[node@]domain[/resource]`.
///
/// A `Jid` built from arbitrary input with [`Jid::new`] may be *invalid*: parsing failures are
/// kept as state and must be checked with [`Jid::is_valid`] before the address is used. Use
/// [`Jid::from_str`] to get the parse error instead.
///
/// Normalization is a conservative ASCII subset of nodeprep/nameprep: node and domain are
/// lowercased, a trailing dot on the domain is dropped, the resource is kept verbatim.
#[derive(Debug, Clone, Default)]
pub struct Jid {
    node: Option<String>,
    domain: String,
    resource: Option<String>,
    valid: bool,
}

impl Jid {
    /// Parses `s`, returning an invalid `Jid` on failure.
    pub fn new(s: impl AsRef<str>) -> Self {
        Self::parse(s.as_ref()).unwrap_or_default()
    }

    /// Builds a `Jid` from its parts. Empty `node`/`resource` strings count as absent.
    pub fn from_parts(
        node: Option<&str>,
        domain: &str,
        resource: Option<&str>,
    ) -> Result<Self, JidError> {
        let node = node.filter(|n| !n.is_empty()).map(normalize_node).transpose()?;
        let domain = normalize_domain(domain)?;
        let resource = resource
            .filter(|r| !r.is_empty())
            .map(normalize_resource)
            .transpose()?;

        Ok(Jid {
            node,
            domain,
            resource,
            valid: true,
        })
    }

    fn parse(s: &str) -> Result<Self, JidError> {
        let (rest, resource) = match s.split_once('/') {
            Some((rest, resource)) => {
                if resource.is_empty() {
                    return Err(JidError::ResourceEmpty);
                }
                (rest, Some(resource))
            }
            None => (s, None),
        };

        let (node, domain) = match rest.split_once('@') {
            Some((node, domain)) => {
                if node.is_empty() {
                    return Err(JidError::NodeEmpty);
                }
                (Some(node), domain)
            }
            None => (None, rest),
        };

        Self::from_parts(node, domain, resource)
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// True for the default `Jid` (nothing parsed, nothing set).
    pub fn is_empty(&self) -> bool {
        self.domain.is_empty() && self.node.is_none() && self.resource.is_none()
    }

    pub fn node(&self) -> Option<&str> {
        self.node.as_deref()
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// `node@domain`, or `domain` when there is no node.
    pub fn bare(&self) -> String {
        match &self.node {
            Some(node) => format!("{}@{}", node, self.domain),
            None => self.domain.clone(),
        }
    }

    /// `bare/resource`, or `bare` when there is no resource.
    pub fn full(&self) -> String {
        match &self.resource {
            Some(resource) => format!("{}/{}", self.bare(), resource),
            None => self.bare(),
        }
    }

    pub fn to_bare(&self) -> Jid {
        Jid {
            node: self.node.clone(),
            domain: self.domain.clone(),
            resource: None,
            valid: self.valid,
        }
    }

    /// The domain as a Jid of its own, i.e. the server hosting this address.
    pub fn to_domain(&self) -> Jid {
        Jid {
            node: None,
            domain: self.domain.clone(),
            resource: None,
            valid: self.valid,
        }
    }

    /// Returns a copy with the resource replaced. An empty resource removes it.
    pub fn with_resource(&self, resource: &str) -> Result<Jid, JidError> {
        Jid::from_parts(self.node(), &self.domain, Some(resource))
    }

    /// Compares two addresses, ignoring the resource unless `include_resource` is set.
    ///
    /// Two empty Jids are equal. Otherwise only valid Jids ever compare equal.
    pub fn compare(&self, other: &Jid, include_resource: bool) -> bool {
        if self.is_empty() && other.is_empty() {
            return true;
        }
        if !self.valid || !other.valid {
            return false;
        }
        if self.node != other.node || self.domain != other.domain {
            return false;
        }
        !include_resource || self.resource == other.resource
    }

    pub fn bare_eq(&self, other: &Jid) -> bool {
        self.compare(other, false)
    }
}

impl FromStr for Jid {
    type Err = JidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for Jid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full())
    }
}

impl PartialEq for Jid {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other, true)
    }
}

impl Eq for Jid {}

impl Hash for Jid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.valid.hash(state);
        self.node.hash(state);
        self.domain.hash(state);
        self.resource.hash(state);
    }
}

fn normalize_node(node: &str) -> Result<String, JidError> {
    check_length("localpart", node)?;
    if let Some(character) = node
        .chars()
        .find(|c| FORBIDDEN_NODE_CHARS.contains(c) || c.is_whitespace() || c.is_control())
    {
        return Err(JidError::ForbiddenCharacter {
            part: "localpart",
            character,
        });
    }
    Ok(node.to_lowercase())
}

fn normalize_domain(domain: &str) -> Result<String, JidError> {
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    if domain.is_empty() {
        return Err(JidError::DomainEmpty);
    }
    check_length("domainpart", domain)?;
    if let Some(character) = domain
        .chars()
        .find(|c| matches!(c, '@' | '/') || c.is_whitespace() || c.is_control())
    {
        return Err(JidError::ForbiddenCharacter {
            part: "domainpart",
            character,
        });
    }
    Ok(domain.to_lowercase())
}

fn normalize_resource(resource: &str) -> Result<String, JidError> {
    check_length("resourcepart", resource)?;
    if let Some(character) = resource.chars().find(|c| c.is_control()) {
        return Err(JidError::ForbiddenCharacter {
            part: "resourcepart",
            character,
        });
    }
    Ok(resource.to_string())
}

fn check_length(part: &'static str, value: &str) -> Result<(), JidError> {
    if value.len() > MAX_PART_LEN {
        return Err(JidError::TooLong { part });
    }
    Ok(())
}
