// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

pub use element_ext::ElementExt;
pub use request_error::{ParseError, RequestError};

pub mod element_ext;
mod request_error;
