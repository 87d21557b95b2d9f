#![allow(clippy::unwrap_used)]
// Integration tests for `NettigoAirMonitor` over reqwest, using wiremock.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{basic_auth, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nam_core::{
    CaqiLevel, ClientConfig, ClientStateKind, ConnectionOptions, ErrorKind, NettigoAirMonitor,
    ReqwestTransport, RetryConfig, TransportError,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn mount_config(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/config.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn setup() -> (MockServer, NettigoAirMonitor) {
    let server = MockServer::start().await;
    mount_config(&server, json!({"www_basicauth_enabled": false})).await;

    let options = ConnectionOptions::new(server.address().to_string());
    let nam = NettigoAirMonitor::connect(reqwest::Client::new(), options)
        .await
        .unwrap();
    (server, nam)
}

fn data() -> serde_json::Value {
    json!({
        "software_version": "NAMF-2020-36",
        "uptime": "456987",
        "sensordatavalues": [
            {"value_type": "PMS_P0", "value": "6.00"},
            {"value_type": "PMS_P1", "value": "10.00"},
            {"value_type": "PMS_P2", "value": "11.00"},
            {"value_type": "temperature", "value": "6.30"},
            {"value_type": "humidity", "value": "90.10"},
            {"value_type": "BMP_pressure", "value": "101410.00"},
            {"value_type": "signal", "value": "-72"}
        ]
    })
}

// ── Connect tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_success() {
    let (_server, nam) = setup().await;

    assert!(!nam.auth_enabled());
    assert_eq!(nam.state(), ClientStateKind::Ready);
}

#[tokio::test]
async fn test_connect_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/config.json"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let options = ConnectionOptions::new(server.address().to_string());
    let err = NettigoAirMonitor::connect(reqwest::Client::new(), options)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AuthFailed);
}

#[tokio::test]
async fn test_connect_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/config.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let host = server.address().to_string();
    let options = ConnectionOptions::new(host.clone());
    let err = NettigoAirMonitor::connect(reqwest::Client::new(), options)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Api);
    assert_eq!(
        err.to_string(),
        format!("Invalid response from device {host}: 404")
    );
}

#[tokio::test]
async fn test_connect_sends_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/config.json"))
        .and(basic_auth("user", "pass"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"www_basicauth_enabled": true})))
        .expect(1)
        .mount(&server)
        .await;

    let options = ConnectionOptions::builder(server.address().to_string())
        .username("user")
        .password("pass")
        .build()
        .unwrap();
    let nam = NettigoAirMonitor::connect(reqwest::Client::new(), options)
        .await
        .unwrap();

    assert!(nam.auth_enabled());
}

#[tokio::test]
async fn test_connect_auth_required() {
    let server = MockServer::start().await;
    mount_config(&server, json!({"www_basicauth_enabled": true})).await;

    let options = ConnectionOptions::new(server.address().to_string());
    let err = NettigoAirMonitor::connect(reqwest::Client::new(), options)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AuthRequired);
}

#[tokio::test]
async fn test_connect_connection_refused() {
    // Bind and release a port so nothing listens on it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let host = listener.local_addr().unwrap().to_string();
    drop(listener);

    let err = NettigoAirMonitor::connect(reqwest::Client::new(), ConnectionOptions::new(host.clone()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Api);
    assert_eq!(err.to_string(), format!("The device {host} is not responding"));
}

// ── Update tests ────────────────────────────────────────────────────

#[tokio::test]
async fn test_update() {
    let (server, nam) = setup().await;
    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(data()))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = nam.async_update().await.unwrap();
    let sensors = &snapshot.sensors;

    assert_eq!(snapshot.software_version, "NAMF-2020-36");
    assert_eq!(sensors.dht22_temperature, Some(6.3));
    assert_eq!(sensors.dht22_humidity, Some(90.1));
    assert_eq!(sensors.bmp180_pressure, Some(1014.1));
    assert_eq!(sensors.pms_p0, Some(6.0));
    assert_eq!(sensors.signal, Some(-72.0));
    assert_eq!(sensors.uptime, Some(456_987));
    assert_eq!(sensors.pms_caqi, Some(18));
    assert_eq!(sensors.pms_caqi_level, Some(CaqiLevel::VeryLow));
    assert_eq!(sensors.sds011_caqi, None);
    assert!(sensors.other.is_empty());
}

#[tokio::test]
async fn test_update_error_status() {
    let (server, nam) = setup().await;
    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = nam.async_update().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Api);
    assert!(err.to_string().ends_with(": 503"));
}

#[tokio::test]
async fn test_update_timeout_escalates() {
    let server = MockServer::start().await;
    mount_config(&server, json!({})).await;
    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(data())
                .set_delay(Duration::from_secs(2)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let config = ClientConfig::default().retry(
        RetryConfig::new(1)
            .initial_delay(Duration::from_millis(50))
            .delay_step(Duration::ZERO),
    );
    let nam = NettigoAirMonitor::create_with_config(
        Arc::new(ReqwestTransport::new(http)),
        ConnectionOptions::new(server.address().to_string()),
        config,
    )
    .await
    .unwrap();

    let err = nam.async_update().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Api);
    assert!(err.to_string().ends_with("is not responding"));
    assert_eq!(err.endpoint(), Some("/data.json"));
    assert_eq!(err.transport_reason(), Some(&TransportError::Timeout));
    assert_eq!(nam.state(), ClientStateKind::Failed);
}

// ── MAC tests ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_mac_address() {
    let (server, nam) = setup().await;
    Mock::given(method("GET"))
        .and(path("/values"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><td>MAC: AA:BB:CC:DD:EE:FF</td></html>"),
        )
        .mount(&server)
        .await;

    assert_eq!(nam.async_get_mac_address().await.unwrap(), "aa:bb:cc:dd:ee:ff");
}

#[tokio::test]
async fn test_get_mac_address_missing() {
    let (server, nam) = setup().await;
    Mock::given(method("GET"))
        .and(path("/values"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let err = nam.async_get_mac_address().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CannotGetMac);
}

// ── Command tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_restart() {
    let (server, nam) = setup().await;
    Mock::given(method("POST"))
        .and(path("/reset"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    nam.async_restart().await.unwrap();
}

#[tokio::test]
async fn test_ota_update() {
    let (server, nam) = setup().await;
    Mock::given(method("POST"))
        .and(path("/ota"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    nam.async_ota_update().await.unwrap();
}

#[tokio::test]
async fn test_restart_unauthorized() {
    let (server, nam) = setup().await;
    Mock::given(method("POST"))
        .and(path("/reset"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = nam.async_restart().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthFailed);
}
