mod support;

use lanlight_sync::{codec, DeviceLink, LightError, Rgb};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;
use support::FakeDevice;

const WAIT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn test_switch_mode_sends_razer_envelope() {
    let device = FakeDevice::bind().await;
    let link = DeviceLink::bind_addr(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)).unwrap();
    let target = device.descriptor("H6199", 4);

    link.switch_mode(&target, true).await.unwrap();
    let (raw, _) = device.recv_raw(WAIT).await.unwrap();
    assert_eq!(
        std::str::from_utf8(&raw).unwrap(),
        r#"{"msg":{"cmd":"razer","data":{"pt":"uwABsQEK"}}}"#
    );

    link.switch_mode(&target, false).await.unwrap();
    assert_eq!(device.recv_pt(WAIT).await.as_deref(), Some("uwABsQAL"));
}

#[tokio::test]
async fn test_send_colors_round_trips_through_codec() {
    let device = FakeDevice::bind().await;
    let link = DeviceLink::bind_addr(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)).unwrap();
    let target = device.descriptor("H61D5", 3);

    let colors = vec![Rgb::new(255, 0, 0), Rgb::new(0, 255, 0), Rgb::new(0, 0, 255)];
    link.send_colors(&target, &colors).await.unwrap();

    let pt = device.recv_pt(WAIT).await.unwrap();
    assert_eq!(codec::decode(&pt).unwrap(), colors);
}

#[tokio::test]
async fn test_send_colors_rejects_wrong_length() {
    let device = FakeDevice::bind().await;
    let link = DeviceLink::bind_addr(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)).unwrap();
    let target = device.descriptor("H61D5", 4);

    let err = link.send_colors(&target, &[Rgb::WHITE; 3]).await.unwrap_err();
    assert!(matches!(err, LightError::FrameLength { expected: 4, actual: 3 }));
    assert!(device.recv_raw(Duration::from_millis(100)).await.is_none());
}
