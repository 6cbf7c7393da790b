// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use minidom::{Element, NSChoice, Node};

use crate::util::ParseError;

pub trait ElementExt {
    fn expect_is<'a>(
        &self,
        name: impl AsRef<str>,
        ns: impl Into<NSChoice<'a>>,
    ) -> Result<(), ParseError>;

    fn attr_req(&self, name: impl AsRef<str>) -> Result<&str, ParseError>;

    fn non_empty_text(&self) -> Option<String>;

    /// Text of the first child named `name`, in any namespace.
    fn child_text(&self, name: &str) -> Option<String>;

    /// Namespace of the first child element, which for IQs is the namespace of the query.
    fn query_ns(&self) -> Option<String>;

    /// Deep copy in which every element without a namespace inherits the nearest namespace
    /// above it, `default_ns` for the root.
    fn with_default_ns(&self, default_ns: &str) -> Element;
}

impl ElementExt for Element {
    fn expect_is<'a>(
        &self,
        name: impl AsRef<str>,
        ns: impl Into<NSChoice<'a>>,
    ) -> Result<(), ParseError> {
        let ns = ns.into();
        if !self.is(&name, ns) {
            return Err(ParseError::Generic {
                msg: format!(
                    "Expected element with name {} and namespace {}. Got {} and {} instead.",
                    name.as_ref(),
                    ns_choice_to_string(ns),
                    self.name(),
                    self.ns()
                ),
            });
        }
        Ok(())
    }

    fn attr_req(&self, name: impl AsRef<str>) -> Result<&str, ParseError> {
        self.attr(name.as_ref()).ok_or(ParseError::Generic {
            msg: format!(
                "Missing required attribute {} in element {}.",
                name.as_ref(),
                self.name()
            ),
        })
    }

    fn non_empty_text(&self) -> Option<String> {
        let text = self.text();
        (!text.is_empty()).then_some(text)
    }

    fn child_text(&self, name: &str) -> Option<String> {
        self.get_child(name, NSChoice::Any).map(Element::text)
    }

    fn query_ns(&self) -> Option<String> {
        self.children().next().map(Element::ns)
    }

    fn with_default_ns(&self, default_ns: &str) -> Element {
        let ns = match self.ns() {
            ns if ns.is_empty() => default_ns.to_string(),
            ns => ns,
        };

        let mut builder = Element::builder(self.name(), ns.clone());
        for (name, value) in self.attrs() {
            builder = builder.attr(name, value);
        }
        for node in self.nodes() {
            builder = match node {
                Node::Element(child) => builder.append(child.with_default_ns(&ns)),
                other => builder.append(other.clone()),
            };
        }
        builder.build()
    }
}

fn ns_choice_to_string<'a>(ns: impl Into<NSChoice<'a>>) -> String {
    match ns.into() {
        NSChoice::None => "<none>".to_string(),
        NSChoice::OneOf(ns) => ns.to_string(),
        NSChoice::AnyOf(ns_list) => ns_list.join(" or "),
        NSChoice::Any => "<any>".to_string(),
    }
}
