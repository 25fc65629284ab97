use std::sync::Arc;

use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ring_ns::hub::{Hub, AUTH_NOTICE, AUTH_NOTICE_KEY};
use ring_ns::nodes::CONTROLLER_ADDRESS;
use ring_ns::oauth::LEGACY_NAMESPACE;
use ring_ns::webhook::WebhookDelivery;
use ring_ns::{HubEvent, LocalHub, PollKind, RingNsConfig, Runner};

mod common;

fn config(server: &MockServer, shared: bool) -> RingNsConfig {
    let shared = if shared { "true" } else { "false" };
    serde_json::from_value(serde_json::json!({
        "hub": {"uuid": "00:21:b9:02:5b:8c", "profileNum": 3, "store": "local"},
        "customParams": {"shared": shared},
        "apiBaseUrl": server.uri(),
    }))
    .unwrap()
}

fn grant() -> serde_json::Value {
    serde_json::json!({
        "access_token": "A1",
        "refresh_token": "R1",
        "token_type": "Bearer",
        "expires_in": 3600
    })
}

/// A runner that has received a grant and finished discovery.
async fn discovered(server: &MockServer, shared: bool) -> (Arc<LocalHub>, Runner) {
    let hub = common::hub();
    let mut runner = Runner::with_hub(config(server, shared), hub.clone());
    runner.start().unwrap();
    runner.dispatch(HubEvent::OAuthGrant(grant())).await.unwrap();
    (hub, runner)
}

fn ding(pragma: &str, event: &str, id: u64) -> WebhookDelivery {
    WebhookDelivery::new(
        [("Pragma", pragma), ("Content-Type", "application/json")],
        serde_json::json!({
            "event": event,
            "data": {"doorbell": {"id": id, "description": "Front Door"}}
        })
        .to_string(),
    )
}

#[tokio::test]
async fn grant_discovers_owned_devices_and_subscribes() {
    let server = MockServer::start().await;
    common::ring_mock::mount_account(&server, "A1").await;
    Mock::given(method("PATCH"))
        .and(path("/subscription"))
        .and(body_partial_json(serde_json::json!({
            "subscription": {
                "postback_url": "https://dev.isy.io/api/eisy/pg3/webhook/noresponse/00:21:b9:02:5b:8c/3"
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (hub, runner) = discovered(&server, false).await;

    let mut addresses = hub.node_addresses();
    addresses.sort();
    assert_eq!(
        addresses,
        vec!["111_db", "111_m", "444_l", "444_m", CONTROLLER_ADDRESS]
    );
    assert_eq!(hub.node("111_db").unwrap().node_def_id, "DOORBELL");
    assert_eq!(hub.node("111_m").unwrap().node_def_id, "DOORBELLMOTION");
    assert_eq!(hub.node("444_m").unwrap().node_def_id, "CAMERA");
    assert_eq!(hub.node("444_l").unwrap().node_def_id, "LIGHT");

    // add-node-done queried the doorbell from the discovery device list
    assert_eq!(hub.driver("111_db", "ST"), Some(1.0));
    assert_eq!(hub.driver("111_db", "BATLVL"), Some(87.0));
    assert_eq!(hub.driver("111_db", "GV1"), Some(3950.0));
    assert_eq!(hub.driver(CONTROLLER_ADDRESS, "ST"), Some(1.0));
    assert!(hub.notices().is_empty());

    // The pragma registered with Ring is the one the plugin now expects
    let requests = server.received_requests().await.unwrap();
    let patch = requests
        .iter()
        .find(|r| r.method.as_str() == "PATCH")
        .unwrap();
    let body: serde_json::Value = patch.body_json().unwrap();
    let pragma = body["subscription"]["metadata"]["headers"]["Pragma"]
        .as_str()
        .unwrap();
    assert_eq!(runner.plugin().ring().webhook_auth().current(), Some(pragma));
}

#[tokio::test]
async fn shared_devices_are_included_when_enabled() {
    let server = MockServer::start().await;
    common::ring_mock::mount_account(&server, "A1").await;
    common::ring_mock::mount_subscription(&server).await;

    let (hub, runner) = discovered(&server, true).await;

    for address in ["111_db", "222_db", "222_m", "333_db", "333_m", "444_m"] {
        assert!(hub.node(address).is_some(), "missing {address}");
    }
    assert_eq!(hub.driver("333_db", "ST"), Some(0.0));
    assert_eq!(runner.plugin().registry().len(), 8);
}

#[tokio::test]
async fn config_done_without_token_sets_auth_notice() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let hub = common::hub();
    let mut runner = Runner::with_hub(config(&server, false), hub.clone());
    runner.start().unwrap();
    runner.dispatch(HubEvent::ConfigDone).await.unwrap();

    assert_eq!(hub.notice(AUTH_NOTICE_KEY).as_deref(), Some(AUTH_NOTICE));
    assert_eq!(hub.node_addresses(), vec![CONTROLLER_ADDRESS]);
}

#[tokio::test]
async fn short_poll_queries_all_nodes_with_one_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "user": {"id": common::USER_ID}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::ring_mock::devices_json()),
        )
        .expect(2)
        .mount(&server)
        .await;
    common::ring_mock::mount_subscription(&server).await;

    let (hub, mut runner) = discovered(&server, false).await;
    hub.set_driver("111_db", "ST", 0.0, 2);

    runner.dispatch(HubEvent::Poll(PollKind::Short)).await.unwrap();
    assert_eq!(hub.driver("111_db", "ST"), Some(1.0));
}

#[tokio::test]
async fn unauthorized_api_call_asks_to_reauthenticate() {
    let server = MockServer::start().await;
    common::ring_mock::mount_account(&server, "A1").await;
    common::ring_mock::mount_subscription(&server).await;
    let (hub, mut runner) = discovered(&server, false).await;

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .expect(1)
        .mount(&server)
        .await;

    let err = runner
        .dispatch(HubEvent::Poll(PollKind::Short))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(hub.notice(AUTH_NOTICE_KEY).as_deref(), Some(AUTH_NOTICE));
    // Without a device list every doorbell is reported offline
    assert_eq!(hub.driver("111_db", "ST"), Some(0.0));
}

#[tokio::test]
async fn authenticated_webhooks_fire_nodes() {
    let server = MockServer::start().await;
    common::ring_mock::mount_account(&server, "A1").await;
    common::ring_mock::mount_subscription(&server).await;
    let (hub, mut runner) = discovered(&server, false).await;
    let pragma = runner
        .plugin()
        .ring()
        .webhook_auth()
        .current()
        .unwrap()
        .to_string();

    runner
        .dispatch(HubEvent::Webhook(ding(&pragma, "new-ding", 111)))
        .await
        .unwrap();
    runner
        .dispatch(HubEvent::Webhook(ding(&pragma, "new-motion", 444)))
        .await
        .unwrap();
    runner
        .dispatch(HubEvent::Webhook(ding(&pragma, "webhook-test", 111)))
        .await
        .unwrap();
    // Unknown event types and unknown devices are ignored
    runner
        .dispatch(HubEvent::Webhook(ding(&pragma, "new-on_demand", 111)))
        .await
        .unwrap();
    runner
        .dispatch(HubEvent::Webhook(ding(&pragma, "new-ding", 999)))
        .await
        .unwrap();

    assert_eq!(
        hub.take_reported_commands(),
        vec![
            ("111_db".to_string(), "DON".to_string()),
            ("444_m".to_string(), "DON".to_string()),
            ("111_db".to_string(), "DON".to_string()),
        ]
    );
}

#[tokio::test]
async fn webhook_with_wrong_or_rotated_pragma_is_ignored() {
    let server = MockServer::start().await;
    common::ring_mock::mount_account(&server, "A1").await;
    common::ring_mock::mount_subscription(&server).await;
    let (hub, mut runner) = discovered(&server, false).await;
    let first = runner
        .plugin()
        .ring()
        .webhook_auth()
        .current()
        .unwrap()
        .to_string();

    runner
        .dispatch(HubEvent::Webhook(ding("forged", "new-ding", 111)))
        .await
        .unwrap();
    runner
        .dispatch(HubEvent::Webhook(WebhookDelivery::new(
            Vec::<(String, String)>::new(),
            r#"{"event":"new-ding","data":{"doorbell":{"id":111}}}"#,
        )))
        .await
        .unwrap();

    // Long poll resubscribes with a new pragma; the old one stops working
    runner.dispatch(HubEvent::Poll(PollKind::Long)).await.unwrap();
    let second = runner
        .plugin()
        .ring()
        .webhook_auth()
        .current()
        .unwrap()
        .to_string();
    assert_ne!(first, second);

    runner
        .dispatch(HubEvent::Webhook(ding(&first, "new-ding", 111)))
        .await
        .unwrap();
    assert!(hub.take_reported_commands().is_empty());

    runner
        .dispatch(HubEvent::Webhook(ding(&second, "new-ding", 111)))
        .await
        .unwrap();
    assert_eq!(hub.take_reported_commands().len(), 1);
}

#[tokio::test]
async fn malformed_authenticated_webhook_is_an_error() {
    let server = MockServer::start().await;
    common::ring_mock::mount_account(&server, "A1").await;
    common::ring_mock::mount_subscription(&server).await;
    let (_hub, mut runner) = discovered(&server, false).await;
    let pragma = runner
        .plugin()
        .ring()
        .webhook_auth()
        .current()
        .unwrap()
        .to_string();

    let err = runner
        .dispatch(HubEvent::Webhook(WebhookDelivery::new(
            [("pragma", pragma.as_str())],
            "not json",
        )))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "webhook_error");
}

#[tokio::test]
async fn light_commands_switch_floodlight() {
    let server = MockServer::start().await;
    common::ring_mock::mount_account(&server, "A1").await;
    common::ring_mock::mount_subscription(&server).await;
    Mock::given(method("PUT"))
        .and(path("/devices/444/floodlight_on"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/devices/444/floodlight_off"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (_hub, mut runner) = discovered(&server, false).await;
    for command in ["DON", "DOF"] {
        runner
            .dispatch(HubEvent::Command {
                address: "444_l".into(),
                command: command.into(),
            })
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn controller_queryall_and_doorbell_query() {
    let server = MockServer::start().await;
    common::ring_mock::mount_account(&server, "A1").await;
    common::ring_mock::mount_subscription(&server).await;
    let (hub, mut runner) = discovered(&server, false).await;

    hub.set_driver("111_db", "BATLVL", 0.0, 51);
    runner
        .dispatch(HubEvent::Command {
            address: "111_db".into(),
            command: "QUERY".into(),
        })
        .await
        .unwrap();
    assert_eq!(hub.driver("111_db", "BATLVL"), Some(87.0));

    hub.set_driver("111_db", "BATLVL", 0.0, 51);
    runner
        .dispatch(HubEvent::Command {
            address: CONTROLLER_ADDRESS.into(),
            command: "QUERYALL".into(),
        })
        .await
        .unwrap();
    assert_eq!(hub.driver("111_db", "BATLVL"), Some(87.0));
}

#[tokio::test]
async fn stop_sets_every_node_offline() {
    let server = MockServer::start().await;
    common::ring_mock::mount_account(&server, "A1").await;
    common::ring_mock::mount_subscription(&server).await;
    let (hub, mut runner) = discovered(&server, false).await;
    assert_eq!(hub.driver("111_db", "ST"), Some(1.0));

    runner.dispatch(HubEvent::Stop).await.unwrap();
    assert_eq!(hub.driver("111_db", "ST"), Some(0.0));
    assert_eq!(hub.driver(CONTROLLER_ADDRESS, "ST"), Some(0.0));
    assert!(hub.is_stopped());
}

#[tokio::test]
async fn legacy_token_is_migrated_on_start() {
    let server = MockServer::start().await;
    let hub = common::hub();
    hub.save_custom_data(
        LEGACY_NAMESPACE,
        serde_json::json!({"token": grant(), "other": 1}),
    )
    .unwrap();

    let mut runner = Runner::with_hub(config(&server, false), hub.clone());
    runner.start().unwrap();

    let oauth = runner.plugin().ring().oauth();
    assert_eq!(oauth.store().get().unwrap().access_token, "A1");
    let legacy = hub.custom_data(LEGACY_NAMESPACE).unwrap();
    assert!(legacy.get("token").is_none());
    assert_eq!(legacy["other"], 1);
}
