// iris-core/iris-xmpp
//
// Copyright: 2023, Marc Bauer <mb@nesium.com>
// License: Mozilla Public License v2.0 (MPL v2.0)

use std::sync::Arc;

use anyhow::Result;
use minidom::Element;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use iris_xmpp::roster::{Event as RosterEvent, Subscription};
use iris_xmpp::test::{ClientTestAdditions, ConnectedClient, ElementTestAdditions};
use iris_xmpp::{client, jid, Client, Event, RequestError};

fn roster_result(id: &str, jids: &[&str]) -> Element {
    let mut query = Element::builder("query", "jabber:iq:roster").build();
    for jid in jids {
        query.append_child(
            Element::builder("item", "jabber:iq:roster")
                .attr("jid", *jid)
                .attr("subscription", "both")
                .build(),
        );
    }
    Element::builder("iq", "jabber:client")
        .attr("type", "result")
        .attr("id", id)
        .append(query)
        .build()
}

fn removed_jids(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::Roster(RosterEvent::ItemRemoved(item)) => Some(item.jid.full()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_requests_roster() -> Result<()> {
    let ConnectedClient {
        client,
        connection,
        sent_events,
        ..
    } = Client::connected_client().await?;

    client.request_roster();

    assert_eq!(
        connection.sent_stanzas(),
        vec![Element::from_pretty_printed_xml(
            r#"<iq xmlns="jabber:client" id="id-1" type="get">
              <query xmlns="jabber:iq:roster"/>
            </iq>"#
        )?]
    );
    assert!(sent_events.read().is_empty());

    connection.receive_stanza(Element::from_pretty_printed_xml(
        r#"<iq xmlns="jabber:client" id="id-1" type="result">
          <query xmlns="jabber:iq:roster">
            <item jid="a@b" subscription="both"/>
          </query>
        </iq>"#,
    )?);

    let roster = client.roster();
    assert_eq!(roster.len(), 1);
    let item = roster.find(&jid!("a@b")).cloned().unwrap();
    assert_eq!(item.subscription, Subscription::Both);
    assert!(!item.is_available());

    assert_eq!(
        *sent_events.read(),
        vec![
            Event::Roster(RosterEvent::ItemAdded(item)),
            Event::Client(client::Event::RosterRequestFinished(Ok(())))
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_roster_refresh_removes_items_missing_on_server() -> Result<()> {
    let ConnectedClient {
        client, connection, ..
    } = Client::connected_client().await?;

    client.request_roster();
    connection.receive_stanza(roster_result(
        "id-1",
        &["a@iris.org", "b@iris.org", "c@iris.org"],
    ));
    assert_eq!(client.roster().len(), 3);

    client.request_roster();
    connection.receive_stanza(roster_result("id-2", &["a@iris.org", "c@iris.org"]));

    let roster = client.roster();
    assert_eq!(
        roster.iter().map(|item| item.jid.full()).collect::<Vec<_>>(),
        vec!["a@iris.org", "c@iris.org"]
    );
    assert!(roster.iter().all(|item| !item.flag_for_delete));

    Ok(())
}

#[tokio::test]
async fn test_roster_refresh_emits_updates_then_removals() -> Result<()> {
    let connected = Client::connected_client().await?;
    let ConnectedClient {
        client, connection, ..
    } = &connected;

    client.request_roster();
    connection.receive_stanza(roster_result("id-1", &["a@iris.org", "b@iris.org"]));
    connected.take_events();

    client.request_roster();
    connection.receive_stanza(roster_result("id-2", &["a@iris.org"]));

    let events = connected.take_events();
    assert_eq!(events.len(), 3);
    assert!(matches!(
        &events[0],
        Event::Roster(RosterEvent::ItemUpdated(item)) if item.jid == jid!("a@iris.org")
    ));
    assert_eq!(removed_jids(&events), vec!["b@iris.org"]);
    assert_eq!(
        events[2],
        Event::Client(client::Event::RosterRequestFinished(Ok(())))
    );

    Ok(())
}

#[tokio::test]
async fn test_failed_roster_request_reports_error() -> Result<()> {
    let connected = Client::connected_client().await?;
    let ConnectedClient {
        client, connection, ..
    } = &connected;

    client.request_roster();
    connection.receive_stanza(Element::from_pretty_printed_xml(
        r#"<iq xmlns="jabber:client" id="id-1" type="error">
          <error type="wait">
            <service-unavailable xmlns="urn:ietf:params:xml:ns:xmpp-stanzas"/>
          </error>
        </iq>"#,
    )?);

    let events = connected.take_events();
    let [Event::Client(client::Event::RosterRequestFinished(Err(err)))] = events.as_slice() else {
        panic!("Unexpected events {:?}", events);
    };
    assert_eq!(err.status_code(), 503);

    Ok(())
}

#[tokio::test]
async fn test_applies_and_acknowledges_roster_push() -> Result<()> {
    let connected = Client::connected_client().await?;
    let ConnectedClient {
        client, connection, ..
    } = &connected;

    connection.receive_stanza(Element::from_pretty_printed_xml(
        r#"<iq xmlns="jabber:client" id="push-1" type="set" from="test@iris.org">
          <query xmlns="jabber:iq:roster">
            <item jid="new@iris.org" name="New" subscription="to">
              <group>Friends</group>
            </item>
          </query>
        </iq>"#,
    )?);

    assert_eq!(
        connection.sent_stanzas(),
        vec![Element::from_pretty_printed_xml(
            r#"<iq xmlns="jabber:client" id="push-1" type="result" to="test@iris.org"/>"#
        )?]
    );

    let item = client.roster().find(&jid!("new@iris.org")).cloned().unwrap();
    assert_eq!(item.name, "New");
    assert!(item.in_group("Friends"));
    assert_eq!(item.subscription, Subscription::To);
    assert_eq!(
        connected.take_events(),
        vec![Event::Roster(RosterEvent::ItemAdded(item))]
    );

    connection.receive_stanza(Element::from_pretty_printed_xml(
        r#"<iq xmlns="jabber:client" id="push-2" type="set">
          <query xmlns="jabber:iq:roster">
            <item jid="new@iris.org" subscription="remove"/>
          </query>
        </iq>"#,
    )?);

    assert!(client.roster().is_empty());
    assert_eq!(removed_jids(&connected.take_events()), vec!["new@iris.org"]);

    Ok(())
}

#[tokio::test]
async fn test_ignores_roster_push_from_foreign_address() -> Result<()> {
    let connected = Client::connected_client().await?;
    let ConnectedClient {
        client, connection, ..
    } = &connected;

    connection.receive_stanza(Element::from_pretty_printed_xml(
        r#"<iq xmlns="jabber:client" id="push-1" type="set" from="mallory@evil.org">
          <query xmlns="jabber:iq:roster">
            <item jid="new@iris.org" subscription="both"/>
          </query>
        </iq>"#,
    )?);

    assert!(client.roster().is_empty());
    assert!(connected.take_events().is_empty());

    // Nobody claimed the request, so it is refused.
    let sent = connection.sent_stanzas();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].attr("type"), Some("error"));
    assert_eq!(sent[0].attr("to"), Some("mallory@evil.org"));

    Ok(())
}

#[tokio::test]
async fn test_updates_roster_item() -> Result<()> {
    let ConnectedClient {
        client, connection, ..
    } = Client::connected_client().await?;

    let result = Arc::new(Mutex::new(None));
    let handler_result = result.clone();
    client.update_roster_item(
        &jid!("a@iris.org"),
        "Alice",
        &["Friends".to_string()],
        move |res| *handler_result.lock() = Some(res),
    );

    assert_eq!(
        connection.sent_stanzas(),
        vec![Element::from_pretty_printed_xml(
            r#"<iq xmlns="jabber:client" id="id-1" type="set">
              <query xmlns="jabber:iq:roster">
                <item jid="a@iris.org" name="Alice">
                  <group>Friends</group>
                </item>
              </query>
            </iq>"#
        )?]
    );
    assert_eq!(*result.lock(), None);

    // A reply from someone we didn't address doesn't count.
    connection.receive_stanza(Element::from_pretty_printed_xml(
        r#"<iq xmlns="jabber:client" id="id-1" type="result" from="a@iris.org/phone"/>"#,
    )?);
    assert_eq!(*result.lock(), None);

    connection.receive_stanza(Element::from_pretty_printed_xml(
        r#"<iq xmlns="jabber:client" id="id-1" type="result" from="iris.org"/>"#,
    )?);
    assert_eq!(*result.lock(), Some(Ok(())));

    Ok(())
}

#[tokio::test]
async fn test_remove_roster_item_reports_error() -> Result<()> {
    let ConnectedClient {
        client, connection, ..
    } = Client::connected_client().await?;

    let result = Arc::new(Mutex::new(None::<Result<(), RequestError>>));
    let handler_result = result.clone();
    client.remove_roster_item(&jid!("a@iris.org"), move |res| {
        *handler_result.lock() = Some(res)
    });

    assert_eq!(
        connection.sent_stanzas(),
        vec![Element::from_pretty_printed_xml(
            r#"<iq xmlns="jabber:client" id="id-1" type="set">
              <query xmlns="jabber:iq:roster">
                <item jid="a@iris.org" subscription="remove"/>
              </query>
            </iq>"#
        )?]
    );

    connection.receive_stanza(Element::from_pretty_printed_xml(
        r#"<iq xmlns="jabber:client" id="id-1" type="error">
          <error type="cancel">
            <item-not-found xmlns="urn:ietf:params:xml:ns:xmpp-stanzas"/>
          </error>
        </iq>"#,
    )?);

    let result = result.lock().clone();
    let Some(Err(err)) = &result else {
        panic!("Expected an error, got {:?}", result);
    };
    assert!(err.is_item_not_found_err());
    assert_eq!(err.status_code(), 404);

    Ok(())
}
