use crate::codec;
use crate::config::LinkConfig;
use crate::error::{LightError, Result};
use crate::protocol::Envelope;
use crate::types::{DeviceDescriptor, Rgb};
use serde::Serialize;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use tokio::net::UdpSocket;

/// UDP endpoint used to talk to light strips
///
/// Bound for broadcast and address reuse on the listen port so discovery
/// replies and device commands share one socket. Cloning is cheap; every
/// clone uses the same socket.
#[derive(Clone, Debug)]
pub struct DeviceLink {
    socket: Arc<UdpSocket>,
    broadcast_addr: Ipv4Addr,
}

impl DeviceLink {
    /// Bind the link on `0.0.0.0:<listen_port>`
    pub fn bind(config: &LinkConfig) -> Result<Self> {
        let link = Self::bind_addr(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.listen_port))?;
        Ok(link.with_broadcast_addr(config.broadcast_addr))
    }

    /// Bind the link on an explicit local address (port 0 picks a free port)
    pub fn bind_addr(addr: SocketAddrV4) -> Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_broadcast(true)?;
        socket.set_reuse_address(true)?;
        socket.bind(&SockAddr::from(addr))?;
        socket.set_nonblocking(true)?;
        let socket: std::net::UdpSocket = socket.into();
        let socket = UdpSocket::from_std(socket)?;

        tracing::debug!("Device link bound on {}", socket.local_addr()?);
        Ok(Self {
            socket: Arc::new(socket),
            broadcast_addr: Ipv4Addr::BROADCAST,
        })
    }

    /// Override the address `broadcast` sends to
    pub fn with_broadcast_addr(mut self, addr: Ipv4Addr) -> Self {
        self.broadcast_addr = addr;
        self
    }

    /// Local address the link is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Switch a device in or out of externally driven lighting mode
    ///
    /// Devices ignore color frames unless this mode is on.
    pub async fn switch_mode(&self, device: &DeviceDescriptor, enabled: bool) -> Result<()> {
        tracing::debug!(
            "Switching razer mode {} on {}",
            if enabled { "on" } else { "off" },
            device
        );
        self.send_envelope(device.socket_addr(), &Envelope::razer(codec::mode_switch(enabled)))
            .await
    }

    /// Send an already encoded frame to a device
    pub async fn send_frame(&self, device: &DeviceDescriptor, encoded: &str) -> Result<()> {
        self.send_envelope(device.socket_addr(), &Envelope::razer(encoded))
            .await
    }

    /// Encode and send one full frame; the frame must cover every LED
    pub async fn send_colors(&self, device: &DeviceDescriptor, colors: &[Rgb]) -> Result<()> {
        if colors.len() != device.leds() {
            return Err(LightError::FrameLength {
                expected: device.leds(),
                actual: colors.len(),
            });
        }
        let encoded = codec::encode(colors)?;
        self.send_frame(device, &encoded).await
    }

    /// Serialize and send a JSON envelope
    pub(crate) async fn send_envelope<T: Serialize>(
        &self,
        target: SocketAddr,
        envelope: &Envelope<T>,
    ) -> Result<()> {
        let json = serde_json::to_vec(envelope)?;
        self.send_to(&json, target).await
    }

    /// Raw datagram send
    pub async fn send_to(&self, bytes: &[u8], target: SocketAddr) -> Result<()> {
        let sent = self.socket.send_to(bytes, target).await?;
        if sent != bytes.len() {
            return Err(LightError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                format!("sent {} of {} bytes to {}", sent, bytes.len(), target),
            )));
        }
        Ok(())
    }

    /// Send a datagram to the broadcast address on `port`
    pub async fn broadcast(&self, bytes: &[u8], port: u16) -> Result<()> {
        self.send_to(bytes, SocketAddr::from((self.broadcast_addr, port)))
            .await
    }

    /// Receive one datagram
    pub async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        Ok(self.socket.recv_from(buf).await?)
    }
}
