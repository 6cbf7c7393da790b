// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use anyhow::Result;
use minidom::Element;
use pretty_assertions::assert_eq;

use iris_xmpp::client::presence::Event as PresenceEvent;
use iris_xmpp::roster::Resource;
use iris_xmpp::stanza::{Status, SubscriptionKind};
use iris_xmpp::test::{
    ClientTestAdditions, ConnectedClient, ConstantTimeProvider, ElementTestAdditions,
};
use iris_xmpp::{client, jid, Client, Event};

/// Adds `jid` to the roster through a server push.
fn add_contact(connected: &ConnectedClient, jid: &str) -> Result<()> {
    connected
        .connection
        .receive_stanza(Element::from_pretty_printed_xml(&format!(
            r#"<iq xmlns="jabber:client" id="push-{jid}" type="set">
              <query xmlns="jabber:iq:roster">
                <item jid="{jid}" subscription="both"/>
              </query>
            </iq>"#
        ))?);
    connected.connection.reset();
    connected.take_events();
    Ok(())
}

fn status_of(presence: &Element) -> Status {
    Status::from_presence(presence, ConstantTimeProvider::default_time())
}

#[tokio::test]
async fn test_contact_resource_comes_and_goes() -> Result<()> {
    let connected = Client::connected_client().await?;
    add_contact(&connected, "a@b")?;

    let available = Element::from_pretty_printed_xml(
        r#"<presence xmlns="jabber:client" from="a@b/phone"/>"#,
    )?;
    connected.connection.receive_stanza(available.clone());

    let item = connected.client.roster().find(&jid!("a@b")).cloned().unwrap();
    assert!(item.is_available());
    assert_eq!(
        item.resources.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        vec!["phone"]
    );
    assert_eq!(item.resources.priority().map(|r| r.priority()), Some(0));

    let unavailable = Element::from_pretty_printed_xml(
        r#"<presence xmlns="jabber:client" from="a@b/phone" type="unavailable"/>"#,
    )?;
    connected.connection.receive_stanza(unavailable.clone());

    let item = connected.client.roster().find(&jid!("a@b")).cloned().unwrap();
    assert!(!item.is_available());
    assert_eq!(item.last_unavailable_status, status_of(&unavailable));

    assert_eq!(
        connected.take_events(),
        vec![
            Event::Presence(PresenceEvent::ResourceAvailable {
                jid: jid!("a@b/phone"),
                resource: Resource::new("phone", status_of(&available)),
            }),
            Event::Presence(PresenceEvent::ResourceUnavailable {
                jid: jid!("a@b/phone"),
                resource: Resource::new("phone", status_of(&unavailable)),
            }),
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_updates_existing_resource_and_picks_highest_priority() -> Result<()> {
    let connected = Client::connected_client().await?;
    add_contact(&connected, "friend@iris.org")?;

    for xml in [
        r#"<presence xmlns="jabber:client" from="friend@iris.org/phone"><priority>1</priority></presence>"#,
        r#"<presence xmlns="jabber:client" from="friend@iris.org/desk"><priority>5</priority></presence>"#,
        r#"<presence xmlns="jabber:client" from="friend@iris.org/phone"><show>away</show><priority>1</priority></presence>"#,
    ] {
        connected
            .connection
            .receive_stanza(Element::from_pretty_printed_xml(xml)?);
    }

    let item = connected
        .client
        .roster()
        .find(&jid!("friend@iris.org"))
        .cloned()
        .unwrap();
    assert_eq!(item.resources.len(), 2);
    assert_eq!(
        item.resources.priority().map(|r| r.name.as_str()),
        Some("desk")
    );
    assert!(item.resources.find("phone").unwrap().status.is_away());

    let events = connected.take_events();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|event| matches!(
        event,
        Event::Presence(PresenceEvent::ResourceAvailable { .. })
    )));

    Ok(())
}

#[tokio::test]
async fn test_unavailable_from_unknown_resource_is_reported_as_pair() -> Result<()> {
    let connected = Client::connected_client().await?;
    add_contact(&connected, "friend@iris.org")?;

    let unavailable = Element::from_pretty_printed_xml(
        r#"<presence xmlns="jabber:client" from="friend@iris.org/laptop" type="unavailable">
          <status>Gone fishing</status>
        </presence>"#,
    )?;
    connected.connection.receive_stanza(unavailable.clone());

    let status = status_of(&unavailable);
    assert_eq!(status.status, "Gone fishing");
    assert_eq!(
        connected.take_events(),
        vec![
            Event::Presence(PresenceEvent::ResourceAvailable {
                jid: jid!("friend@iris.org/laptop"),
                resource: Resource::new("laptop", status.clone()),
            }),
            Event::Presence(PresenceEvent::ResourceUnavailable {
                jid: jid!("friend@iris.org/laptop"),
                resource: Resource::new("laptop", status.clone()),
            }),
        ]
    );

    let item = connected
        .client
        .roster()
        .find(&jid!("friend@iris.org"))
        .cloned()
        .unwrap();
    assert!(item.resources.is_empty());
    assert_eq!(item.last_unavailable_status, status);

    Ok(())
}

#[tokio::test]
async fn test_ignores_presence_from_strangers() -> Result<()> {
    let connected = Client::connected_client().await?;

    connected
        .connection
        .receive_stanza(Element::from_pretty_printed_xml(
            r#"<presence xmlns="jabber:client" from="stranger@iris.org/home"/>"#,
        )?);

    assert!(connected.take_events().is_empty());
    assert!(connected.connection.sent_stanzas().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_reports_presence_error() -> Result<()> {
    let connected = Client::connected_client().await?;
    add_contact(&connected, "friend@elsewhere.org")?;

    connected
        .connection
        .receive_stanza(Element::from_pretty_printed_xml(
            r#"<presence xmlns="jabber:client" from="friend@elsewhere.org" type="error">
              <error type="cancel">
                <remote-server-not-found xmlns="urn:ietf:params:xml:ns:xmpp-stanzas"/>
              </error>
            </presence>"#,
        )?);

    let events = connected.take_events();
    let [Event::Presence(PresenceEvent::Error { jid, error })] = events.as_slice() else {
        panic!("Unexpected events {:?}", events);
    };
    assert_eq!(jid, &jid!("friend@elsewhere.org"));
    assert_eq!(error.code, 404);

    // The contact's resources are left alone.
    let item = connected
        .client
        .roster()
        .find(&jid!("friend@elsewhere.org"))
        .cloned()
        .unwrap();
    assert!(item.resources.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_receives_subscription_request() -> Result<()> {
    let connected = Client::connected_client().await?;

    connected
        .connection
        .receive_stanza(Element::from_pretty_printed_xml(
            r#"<presence xmlns="jabber:client" from="friend@iris.org" type="subscribe">
              <nick xmlns="http://jabber.org/protocol/nick">Friend</nick>
            </presence>"#,
        )?);

    assert_eq!(
        connected.take_events(),
        vec![Event::Presence(PresenceEvent::Subscription {
            jid: jid!("friend@iris.org"),
            kind: SubscriptionKind::Subscribe,
            nick: Some("Friend".to_string()),
        })]
    );
    assert!(connected.client.roster().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_sends_subscription_answer() -> Result<()> {
    let ConnectedClient {
        client, connection, ..
    } = Client::connected_client().await?;

    client.send_subscription(&jid!("friend@iris.org"), SubscriptionKind::Subscribed, None);
    client.send_subscription(
        &jid!("other@iris.org"),
        SubscriptionKind::Subscribe,
        Some("Tester"),
    );

    assert_eq!(
        connection.sent_stanzas(),
        vec![
            Element::from_pretty_printed_xml(
                r#"<presence xmlns="jabber:client" to="friend@iris.org" type="subscribed"/>"#
            )?,
            Element::from_pretty_printed_xml(
                r#"<presence xmlns="jabber:client" to="other@iris.org" type="subscribe">
                  <nick xmlns="http://jabber.org/protocol/nick">Tester</nick>
                </presence>"#
            )?,
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_own_presence_updates_resource_list() -> Result<()> {
    let connected = Client::connected_client().await?;
    let ConnectedClient {
        client, connection, ..
    } = &connected;

    let status = Status::new("away", "Lunch", 5, true);
    client.set_presence(status.clone());

    assert_eq!(
        connection.sent_stanzas(),
        vec![Element::from_pretty_printed_xml(
            r#"<presence xmlns="jabber:client">
              <show>away</show>
              <status>Lunch</status>
              <priority>5</priority>
            </presence>"#
        )?]
    );
    assert_eq!(
        client.resources().find("test"),
        Some(&Resource::new("test", status.clone()))
    );
    assert_eq!(
        connected.take_events(),
        vec![Event::Presence(PresenceEvent::ResourceAvailable {
            jid: jid!("test@iris.org/test"),
            resource: Resource::new("test", status),
        })]
    );

    // Another session of ours shows up.
    connection.receive_stanza(Element::from_pretty_printed_xml(
        r#"<presence xmlns="jabber:client" from="test@iris.org/mobile"/>"#,
    )?);
    assert_eq!(client.resources().len(), 2);

    client.set_presence(Status::unavailable());
    assert!(client.resources().find("test").is_none());
    assert!(client.resources().find("mobile").is_some());

    let events = connected.take_events();
    assert!(matches!(
        events.last(),
        Some(Event::Presence(PresenceEvent::ResourceUnavailable { resource, .. }))
            if resource.name == "test"
    ));

    Ok(())
}

#[tokio::test]
async fn test_contact_resources_end_with_the_session() -> Result<()> {
    let connected = Client::connected_client().await?;
    let ConnectedClient {
        client, connection, ..
    } = &connected;
    add_contact(&connected, "a@b")?;

    connection.receive_stanza(Element::from_pretty_printed_xml(
        r#"<presence xmlns="jabber:client" from="a@b/phone"/>"#,
    )?);
    connected.take_events();

    connection.receive_disconnect(None);

    let gone = Status::unavailable().at(ConstantTimeProvider::default_time());
    let item = client.roster().find(&jid!("a@b")).cloned().unwrap();
    assert!(!item.is_available());
    assert!(item.resources.is_empty());
    assert_eq!(item.last_unavailable_status, gone);
    assert!(client.resources().is_empty());
    assert_eq!(
        connected.take_events(),
        vec![
            Event::Presence(PresenceEvent::ResourceUnavailable {
                jid: jid!("a@b/phone"),
                resource: Resource::new("phone", gone),
            }),
            Event::Client(client::Event::Disconnected { error: None }),
        ]
    );

    client.connect(&jid!("test@iris.org/test"), "").await?;

    let item = client.roster().find(&jid!("a@b")).cloned().unwrap();
    assert!(!item.is_available());

    Ok(())
}

#[tokio::test]
async fn test_own_resource_is_stamped_with_session_time() -> Result<()> {
    let ConnectedClient { client, .. } = Client::connected_client().await?;

    let own = client.resources().find("test").cloned().unwrap();
    assert!(!own.status.available);
    assert_eq!(own.status.timestamp, ConstantTimeProvider::default_time());

    Ok(())
}
