mod support;

use lanlight_sync::{DeviceLink, DiscoveryClient, LinkConfig, Position};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};
use support::FakeDevice;

fn loopback_config(port: u16, timeout_ms: u64) -> LinkConfig {
    LinkConfig {
        broadcast_addr: Ipv4Addr::LOCALHOST,
        discovery_port: port,
        listen_port: 0,
        timeout_ms,
    }
}

#[tokio::test]
async fn test_discovery_without_replies_is_empty() {
    let silent = FakeDevice::bind().await;
    let config = loopback_config(silent.port(), 200);
    let link = DeviceLink::bind(&config).unwrap();

    let started = Instant::now();
    let devices = DiscoveryClient::new(config).discover(&link).await;

    assert!(devices.is_empty());
    assert!(started.elapsed() >= Duration::from_millis(200));

    // The probe still went out
    let (probe, _) = silent.recv_raw(Duration::from_millis(500)).await.unwrap();
    let probe: serde_json::Value = serde_json::from_slice(&probe).unwrap();
    assert_eq!(probe["msg"]["cmd"], "scan");
    assert_eq!(probe["msg"]["data"]["account_topic"], "reserve");
}

#[tokio::test]
async fn test_discovery_collects_and_dedupes_replies() {
    let device = FakeDevice::bind().await;
    let config = loopback_config(device.port(), 500);
    let link = DeviceLink::bind(&config).unwrap();

    let responder = tokio::spawn(async move {
        let (_, from) = device.recv_raw(Duration::from_secs(2)).await.unwrap();
        let replies: [&[u8]; 4] = [
            br#"{"msg":{"cmd":"scan","data":{"ip":"127.0.0.1","device":"AA:BB","sku":"H6199"}}}"#,
            br#"{"msg":{"cmd":"scan","data":{"ip":"127.0.0.1","device":"AA:BB","sku":"H6199"}}}"#,
            b"garbage",
            br#"{"msg":{"cmd":"scan","data":{"sku":"H61D5"}}}"#,
        ];
        for reply in replies {
            device.socket.send_to(reply, from).await.unwrap();
        }
    });

    let devices = DiscoveryClient::new(config).discover(&link).await;
    responder.await.unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].model, "H6199");
    assert_eq!(devices[0].id.as_deref(), Some("AA:BB"));
    assert_eq!(devices[0].port, 4003);
    assert_eq!(devices[0].position, Position::Center);
    // Missing ip falls back to the reply's source address
    assert_eq!(devices[1].model, "H61D5");
    assert_eq!(devices[1].address.to_string(), "127.0.0.1");
}
