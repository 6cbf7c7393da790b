// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use std::fmt::{Display, Formatter};

use minidom::{Element, NSChoice};
use xmpp_parsers::stanza_error::{DefinedCondition, StanzaError};

use crate::util::ElementExt;

/// The `<error/>` carried by an error stanza, reduced to the legacy numeric code plus a
/// human readable description.
#[derive(Debug, Clone, PartialEq)]
pub struct StanzaFault {
    pub code: i32,
    pub condition: Option<DefinedCondition>,
    pub text: String,
}

impl StanzaFault {
    /// Reads the `<error/>` child of `stanza`. Returns `None` if there is none.
    pub fn from_stanza(stanza: &Element) -> Option<Self> {
        stanza
            .get_child("error", NSChoice::Any)
            .map(StanzaFault::from_error_element)
    }

    /// Parses RFC 6120 errors through `xmpp_parsers`, falling back to the pre-RFC form
    /// `<error code='404'>Not Found</error>`.
    pub fn from_error_element(error: &Element) -> Self {
        if let Ok(err) = StanzaError::try_from(error.clone()) {
            let code = error
                .attr("code")
                .and_then(|code| code.parse().ok())
                .unwrap_or_else(|| legacy_code(&err.defined_condition));
            let text = err
                .texts
                .values()
                .next()
                .cloned()
                .unwrap_or_else(|| description(code).to_string());

            return StanzaFault {
                code,
                condition: Some(err.defined_condition),
                text,
            };
        }

        let code = error
            .attr("code")
            .and_then(|code| code.parse().ok())
            .unwrap_or(0);
        let text = error
            .child_text("text")
            .filter(|text| !text.is_empty())
            .or_else(|| error.non_empty_text().map(|text| text.trim().to_string()))
            .unwrap_or_else(|| description(code).to_string());

        StanzaFault {
            code,
            condition: None,
            text,
        }
    }
}

impl Display for StanzaFault {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.text, self.code)
    }
}

/// Maps a defined condition to the code the Jabber protocol used before RFC 3920.
pub fn legacy_code(condition: &DefinedCondition) -> i32 {
    match condition {
        DefinedCondition::BadRequest => 400,
        DefinedCondition::Conflict => 409,
        DefinedCondition::FeatureNotImplemented => 501,
        DefinedCondition::Forbidden => 403,
        DefinedCondition::Gone { .. } => 302,
        DefinedCondition::InternalServerError => 500,
        DefinedCondition::ItemNotFound => 404,
        DefinedCondition::JidMalformed => 400,
        DefinedCondition::NotAcceptable => 406,
        DefinedCondition::NotAllowed => 405,
        DefinedCondition::NotAuthorized => 401,
        DefinedCondition::PolicyViolation => 406,
        DefinedCondition::RecipientUnavailable => 404,
        DefinedCondition::Redirect { .. } => 302,
        DefinedCondition::RegistrationRequired => 407,
        DefinedCondition::RemoteServerNotFound => 404,
        DefinedCondition::RemoteServerTimeout => 504,
        DefinedCondition::ResourceConstraint => 500,
        DefinedCondition::ServiceUnavailable => 503,
        DefinedCondition::SubscriptionRequired => 407,
        DefinedCondition::UndefinedCondition => 500,
        DefinedCondition::UnexpectedRequest => 400,
    }
}

fn description(code: i32) -> &'static str {
    match code {
        302 => "Redirect",
        400 => "Bad request",
        401 => "Not authorized",
        402 => "Payment required",
        403 => "Forbidden",
        404 => "Not found",
        405 => "Not allowed",
        406 => "Not acceptable",
        407 => "Registration required",
        408 => "Request timeout",
        409 => "Conflict",
        500 => "Internal server error",
        501 => "Feature not implemented",
        502 => "Remote server error",
        503 => "Service unavailable",
        504 => "Remote server timeout",
        _ => "Unknown error",
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_parses_rfc6120_error() {
        let iq = Element::from_str(
            r#"<iq xmlns="jabber:client" type="error" id="a1">
                <error type="cancel">
                    <item-not-found xmlns="urn:ietf:params:xml:ns:xmpp-stanzas"/>
                </error>
            </iq>"#,
        )
        .unwrap();

        let fault = StanzaFault::from_stanza(&iq).unwrap();
        assert_eq!(fault.code, 404);
        assert_eq!(fault.condition, Some(DefinedCondition::ItemNotFound));
        assert_eq!(fault.text, "Not found");
    }

    #[test]
    fn test_parses_legacy_error() {
        let presence = Element::from_str(
            r#"<presence xmlns="jabber:client" type="error"><error code="409">Conflict!</error></presence>"#,
        )
        .unwrap();

        let fault = StanzaFault::from_stanza(&presence).unwrap();
        assert_eq!(fault.code, 409);
        assert_eq!(fault.condition, None);
        assert_eq!(fault.text, "Conflict!");
    }

    #[test]
    fn test_missing_error_element() {
        let presence = Element::from_str(r#"<presence xmlns="jabber:client"/>"#).unwrap();
        assert_eq!(StanzaFault::from_stanza(&presence), None);
    }
}
