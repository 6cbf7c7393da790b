// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use xmpp_parsers::stanza_error::DefinedCondition;

use crate::stanza::StanzaFault;

/// Why a task finished unsuccessfully.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error("Disconnected")]
    Disconnected,
    #[error("Request Error: Unexpected server response")]
    UnexpectedResponse,
    #[error("XMPP Error: {err}")]
    XMPP { err: StanzaFault },
    #[error("Request error: {msg}")]
    Generic { msg: String },
    #[error(transparent)]
    ParseError(#[from] ParseError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Parse error: {msg}")]
    Generic { msg: String },
    #[error(transparent)]
    ParseIntError(#[from] std::num::ParseIntError),
}

impl From<xmpp_parsers::Error> for ParseError {
    fn from(value: xmpp_parsers::Error) -> Self {
        ParseError::Generic {
            msg: value.to_string(),
        }
    }
}

impl From<xmpp_parsers::Error> for RequestError {
    fn from(value: xmpp_parsers::Error) -> Self {
        Self::ParseError(value.into())
    }
}

impl From<StanzaFault> for RequestError {
    fn from(value: StanzaFault) -> Self {
        Self::XMPP { err: value }
    }
}

impl RequestError {
    /// The numeric status a task reports alongside its failure. `1` marks a lost connection,
    /// `0` a failure that carried no XMPP error.
    pub fn status_code(&self) -> i32 {
        match self {
            RequestError::Disconnected => 1,
            RequestError::XMPP { err } => err.code,
            _ => 0,
        }
    }

    pub fn is_disconnect(&self) -> bool {
        matches!(self, RequestError::Disconnected)
    }

    pub fn is_item_not_found_err(&self) -> bool {
        self.defined_condition() == Some(DefinedCondition::ItemNotFound)
    }

    pub fn defined_condition(&self) -> Option<DefinedCondition> {
        let RequestError::XMPP { err } = self else {
            return None;
        };
        err.condition.clone()
    }
}
