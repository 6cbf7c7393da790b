// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum JidError {
    #[error("Invalid JID: domainpart is empty")]
    DomainEmpty,
    #[error("Invalid JID: localpart is empty")]
    NodeEmpty,
    #[error("Invalid JID: resourcepart is empty")]
    ResourceEmpty,
    #[error("Invalid JID: {part} is longer than 1023 octets")]
    TooLong { part: &'static str },
    #[error("Invalid JID: {part} contains the forbidden character {character:?}")]
    ForbiddenCharacter {
        part: &'static str,
        character: char,
    },
}
