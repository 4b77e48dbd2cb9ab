#![allow(dead_code)]

use lanlight_sync::{DeviceDescriptor, DeviceDefaults, DeviceRecord, Envelope, RazerData};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;

/// A loopback socket standing in for a light strip
pub struct FakeDevice {
    pub socket: UdpSocket,
}

impl FakeDevice {
    pub async fn bind() -> Self {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        Self { socket }
    }

    pub fn port(&self) -> u16 {
        self.socket.local_addr().unwrap().port()
    }

    /// Descriptor pointing at this socket
    pub fn descriptor(&self, model: &str, leds: i64) -> DeviceDescriptor {
        let record = DeviceRecord {
            ip: Some("127.0.0.1".to_string()),
            port: Some(self.port()),
            model: Some(model.to_string()),
            nled: Some(leds),
            ..DeviceRecord::default()
        };
        DeviceDescriptor::from_record(record, &DeviceDefaults::default(), None).unwrap()
    }

    pub async fn recv_raw(&self, wait: Duration) -> Option<(Vec<u8>, SocketAddr)> {
        let mut buf = vec![0u8; 4096];
        match tokio::time::timeout(wait, self.socket.recv_from(&mut buf)).await {
            Ok(Ok((len, from))) => Some((buf[..len].to_vec(), from)),
            _ => None,
        }
    }

    /// Next razer payload (`pt`) received
    pub async fn recv_pt(&self, wait: Duration) -> Option<String> {
        let (bytes, _) = self.recv_raw(wait).await?;
        let envelope: Envelope<RazerData> = serde_json::from_slice(&bytes).unwrap();
        Some(envelope.msg.data.pt)
    }

    /// Read payloads until `pt` arrives or `wait` passes without traffic
    pub async fn wait_for_pt(&self, pt: &str, wait: Duration) -> bool {
        while let Some(received) = self.recv_pt(wait).await {
            if received == pt {
                return true;
            }
        }
        false
    }
}
