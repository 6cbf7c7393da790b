// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use anyhow::Result;
use async_trait::async_trait;
use secrecy::Secret;

use crate::client::{ClientInfo, ConnectorProvider, EventHandler};
use crate::connector::{Connection, ConnectionError, ConnectionEventHandler, Connector};
use crate::deps::{IDProvider, SeededIDProvider, SystemTimeProvider, TimeProvider};
use crate::jid::Jid;
use crate::{Client, Event};

pub struct UndefinedConnector {}

pub struct ClientBuilder {
    connector_provider: ConnectorProvider,
    id_provider: Box<dyn IDProvider>,
    time_provider: Box<dyn TimeProvider>,
    event_handler: EventHandler,
    info: ClientInfo,
}

impl ClientBuilder {
    pub(super) fn new() -> Self {
        ClientBuilder {
            connector_provider: Box::new(|| Box::new(UndefinedConnector {})),
            id_provider: Box::new(SeededIDProvider::new()),
            time_provider: Box::new(SystemTimeProvider::default()),
            event_handler: Box::new(|_, _| {}),
            info: ClientInfo::default(),
        }
    }

    pub fn set_connector_provider(mut self, connector_provider: ConnectorProvider) -> Self {
        self.connector_provider = connector_provider;
        self
    }

    /// Receives every event synchronously, in the order the events occurred.
    pub fn set_event_handler(
        mut self,
        handler: impl Fn(Client, Event) + Send + Sync + 'static,
    ) -> Self {
        self.event_handler = Box::new(handler);
        self
    }

    pub fn set_id_provider<P: IDProvider + 'static>(mut self, id_provider: P) -> Self {
        self.id_provider = Box::new(id_provider);
        self
    }

    pub fn set_time_provider<T: TimeProvider + 'static>(mut self, time_provider: T) -> Self {
        self.time_provider = Box::new(time_provider);
        self
    }

    /// Answer to `jabber:iq:version` requests.
    pub fn set_software_version(
        mut self,
        name: impl Into<String>,
        version: impl Into<String>,
        os: impl Into<String>,
    ) -> Self {
        self.info.name = name.into();
        self.info.version = version.into();
        self.info.os = os.into();
        self
    }

    pub fn set_identity(
        mut self,
        category: impl Into<String>,
        type_: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.info.identity.category = category.into();
        self.info.identity.type_ = type_.into();
        self.info.identity.name = name.into();
        self
    }

    /// Entity capabilities (XEP-0115) advertised in disco#info.
    pub fn set_caps(
        mut self,
        node: impl Into<String>,
        version: impl Into<String>,
        ext: impl Into<String>,
    ) -> Self {
        self.info.caps_node = node.into();
        self.info.caps_version = version.into();
        self.info.caps_ext = ext.into();
        self
    }

    pub fn add_feature(mut self, var: impl Into<String>) -> Self {
        let var = var.into();
        if !self.info.custom_features.contains(&var) {
            self.info.custom_features.push(var);
        }
        self
    }

    /// Features published under the caps node `<node>#<name>`.
    pub fn add_extension(mut self, name: impl Into<String>, features: Vec<String>) -> Self {
        self.info.extensions.insert(name.into(), features);
        self
    }

    pub fn build(self) -> Client {
        Client::new(
            self.connector_provider,
            self.event_handler,
            self.info,
            self.id_provider,
            self.time_provider,
        )
    }
}

#[async_trait]
impl Connector for UndefinedConnector {
    async fn connect(
        &self,
        _jid: &Jid,
        _password: Secret<String>,
        _event_handler: ConnectionEventHandler,
    ) -> Result<Box<dyn Connection>, ConnectionError> {
        Err(ConnectionError::Generic {
            msg: "Client doesn't have a connector. Provide one before calling connect()"
                .to_string(),
        })
    }
}
