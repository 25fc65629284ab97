use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::USER_ID;

/// An account with one owned doorbell, one shared doorbell and one camera
/// with a floodlight.
#[allow(dead_code)]
pub fn devices_json() -> serde_json::Value {
    serde_json::json!({
        "doorbells": [
            {
                "id": 111,
                "description": "Front Door",
                "kind": "doorbell_v4",
                "owner": {"id": USER_ID},
                "alerts": {"connection": "online"},
                "battery_life": 87,
                "battery_life_2": null,
                "battery_voltage": "3950"
            },
            {
                "id": 222,
                "description": "Parents Door",
                "owner": {"id": 9999},
                "alerts": {"connection": "online"}
            }
        ],
        "authorized_doorbells": [
            {
                "id": 333,
                "description": "Neighbor",
                "owner": {"id": 8888},
                "alerts": {"connection": "offline"}
            }
        ],
        "stickup_cams": [
            {
                "id": 444,
                "description": "Driveway",
                "owner": {"id": USER_ID},
                "alerts": {"connection": "online"},
                "led_status": "off"
            }
        ]
    })
}

/// Mount `/user/info` and `/devices` expecting bearer `token`.
#[allow(dead_code)]
pub async fn mount_account(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/user/info"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "user": {"id": USER_ID, "email": "user@example.com"}
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/devices"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(devices_json()))
        .mount(server)
        .await;
}

#[allow(dead_code)]
pub async fn mount_subscription(server: &MockServer) {
    Mock::given(method("PATCH"))
        .and(path("/subscription"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(server)
        .await;
}

/// Token endpoint answering every refresh with `access_token`.
#[allow(dead_code)]
pub async fn mount_token_endpoint(
    server: &MockServer,
    access_token: &str,
    refresh_token: &str,
    expected_calls: u64,
) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": access_token,
            "refresh_token": refresh_token,
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}
