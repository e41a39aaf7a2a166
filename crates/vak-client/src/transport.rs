// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Datagram transport to authorities.
//!
//! The session never touches sockets. A [`Transport`] sends the query packet
//! and hands back whatever datagrams arrive; deciding whether they are
//! genuine is the session's job.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use log::debug;

/// Largest datagram accepted from an authority.
pub const MAX_DATAGRAM: usize = 4096;

/// Sends query packets and polls for replies.
pub trait Transport {
    /// Send `packet` to `host:port`. Replies to earlier sends may be dropped.
    fn send(&mut self, host: &str, port: u16, packet: &[u8]) -> io::Result<()>;

    /// Wait a bounded time for one datagram of at most `max_len` bytes.
    ///
    /// `Ok(None)` means nothing arrived in time.
    fn recv(&mut self, max_len: usize) -> io::Result<Option<Vec<u8>>>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, host: &str, port: u16, packet: &[u8]) -> io::Result<()> {
        (**self).send(host, port, packet)
    }

    fn recv(&mut self, max_len: usize) -> io::Result<Option<Vec<u8>>> {
        (**self).recv(max_len)
    }
}

/// Unspecified local address in the same family as `target`.
pub(crate) fn bind_addr_for(target: &SocketAddr) -> SocketAddr {
    match target {
        SocketAddr::V4(_) => SocketAddr::from(([0, 0, 0, 0], 0)),
        SocketAddr::V6(_) => SocketAddr::from(([0u16; 8], 0)),
    }
}

/// Resolve `host:port` to its first address.
pub(crate) fn resolve(host: &str, port: u16) -> io::Result<SocketAddr> {
    (host, port).to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{host}:{port} resolved to no socket addresses"),
        )
    })
}

/// Blocking UDP transport.
///
/// Each `send` binds a fresh socket, so a late reply from a previous
/// authority can never be mistaken for the current one. Datagrams from any
/// address other than the current peer are discarded.
#[derive(Debug)]
pub struct UdpTransport {
    poll_interval: Duration,
    socket: Option<UdpSocket>,
    peer: Option<SocketAddr>,
}

impl UdpTransport {
    /// A transport whose `recv` blocks at most `poll_interval`.
    ///
    /// `poll_interval` must be non-zero.
    pub fn new(poll_interval: Duration) -> Self {
        UdpTransport {
            poll_interval,
            socket: None,
            peer: None,
        }
    }

    /// Local address of the current socket, once a query has been sent.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, host: &str, port: u16, packet: &[u8]) -> io::Result<()> {
        self.socket = None;
        self.peer = None;

        let target = resolve(host, port)?;
        let sock = UdpSocket::bind(bind_addr_for(&target))?;
        sock.set_read_timeout(Some(self.poll_interval))?;

        let sz = sock.send_to(packet, target)?;
        debug!("roughtime: sent {} bytes to {:?}", sz, target);

        self.socket = Some(sock);
        self.peer = Some(target);
        Ok(())
    }

    fn recv(&mut self, max_len: usize) -> io::Result<Option<Vec<u8>>> {
        let Some(sock) = &self.socket else {
            return Ok(None);
        };
        let mut buf = vec![0u8; max_len];
        match sock.recv_from(&mut buf) {
            Ok((len, src)) if Some(src) == self.peer => {
                debug!("roughtime: recv {} bytes from {:?}", len, src);
                buf.truncate(len);
                Ok(Some(buf))
            }
            Ok((len, src)) => {
                debug!("roughtime: dropped {} bytes from unexpected {:?}", len, src);
                Ok(None)
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_addr_family() {
        let v4: SocketAddr = "192.0.2.1:2002".parse().unwrap();
        let v6: SocketAddr = "[2001:db8::1]:2002".parse().unwrap();
        assert!(bind_addr_for(&v4).is_ipv4());
        assert!(bind_addr_for(&v6).is_ipv6());
    }

    #[test]
    fn test_recv_before_send_is_empty() {
        let mut t = UdpTransport::new(Duration::from_millis(10));
        assert!(t.recv(MAX_DATAGRAM).unwrap().is_none());
        assert!(t.local_addr().is_none());
    }

    #[test]
    fn test_loopback_roundtrip() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = server.local_addr().unwrap().port();

        let mut t = UdpTransport::new(Duration::from_millis(500));
        t.send("127.0.0.1", port, b"ping").unwrap();

        let mut buf = [0u8; 16];
        let (len, from) = server.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"ping");
        server.send_to(b"pong", from).unwrap();

        assert_eq!(t.recv(MAX_DATAGRAM).unwrap().as_deref(), Some(&b"pong"[..]));
    }

    #[test]
    fn test_stranger_is_dropped() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = server.local_addr().unwrap().port();
        let mut t = UdpTransport::new(Duration::from_millis(200));
        t.send("127.0.0.1", port, b"ping").unwrap();

        let stranger = UdpSocket::bind("127.0.0.1:0").unwrap();
        stranger.send_to(b"spoof", t.local_addr().unwrap()).unwrap();
        assert_eq!(t.recv(MAX_DATAGRAM).unwrap(), None);
    }

    #[test]
    fn test_quiet_peer_times_out() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = server.local_addr().unwrap().port();
        let mut t = UdpTransport::new(Duration::from_millis(20));
        t.send("127.0.0.1", port, b"ping").unwrap();
        assert_eq!(t.recv(MAX_DATAGRAM).unwrap(), None);
    }
}
