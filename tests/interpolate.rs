mod support;

use lanlight_sync::modes::SyncContext;
use lanlight_sync::{
    codec, DeviceLink, Interpolator, Rgb, SessionParams, SyncTiming, TransitionReport, TransitionTarget,
};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;
use support::FakeDevice;
use tokio::sync::watch;

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(100);

fn loopback_link() -> DeviceLink {
    DeviceLink::bind_addr(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)).unwrap()
}

#[tokio::test]
async fn test_transition_survives_failing_device() {
    let good = FakeDevice::bind().await;
    let bad = FakeDevice::bind().await;
    let link = loopback_link();

    let good_strip = good.descriptor("H6199", 3);
    // Four LEDs but three-color frames, so every send fails
    let bad_strip = bad.descriptor("H61D5", 4);

    let start = vec![Rgb::BLACK, Rgb::new(200, 0, 0), Rgb::WHITE];
    let end = vec![Rgb::WHITE, Rgb::new(0, 0, 200), Rgb::BLACK];
    let targets = [
        TransitionTarget {
            device: &bad_strip,
            start: &start,
            end: &end,
        },
        TransitionTarget {
            device: &good_strip,
            start: &start,
            end: &end,
        },
    ];

    let interpolator = Interpolator::new(3, Duration::from_millis(1));
    let report = interpolator.run(&link, &targets).await;
    assert_eq!(
        report,
        TransitionReport {
            frames_sent: 3,
            failures: 3
        }
    );

    let mut frames = Vec::new();
    for _ in 0..3 {
        frames.push(codec::decode(&good.recv_pt(WAIT).await.unwrap()).unwrap());
    }
    assert_eq!(frames[0], start);
    assert_ne!(frames[2], start);
    assert!(frames[1][0].r >= frames[0][0].r && frames[2][0].r >= frames[1][0].r);
    assert!(good.recv_raw(QUIET).await.is_none());
    assert!(bad.recv_raw(QUIET).await.is_none());
}

#[tokio::test]
async fn test_send_all_continues_past_failed_device() {
    let good = FakeDevice::bind().await;
    let bad = FakeDevice::bind().await;
    let (_params_tx, params) = watch::channel(SessionParams::default());
    let ctx = SyncContext {
        link: loopback_link(),
        devices: Arc::new(vec![bad.descriptor("H61D5", 4), good.descriptor("H6199", 2)]),
        params,
        timing: SyncTiming::default(),
    };

    let colors = vec![Rgb::new(0, 120, 255); 2];
    let failures = ctx.send_all(&[colors.clone(), colors.clone()]).await;
    assert_eq!(failures, 1);

    assert_eq!(codec::decode(&good.recv_pt(WAIT).await.unwrap()).unwrap(), colors);
    assert!(bad.recv_raw(QUIET).await.is_none());
}
