//! UDP transport.
//!
//! [`UdpChannel`] is a thin wrapper around a connected
//! `std::net::UdpSocket`.  All protocol logic lives elsewhere; this module
//! owns only byte I/O.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use crate::channel::Channel;
use crate::packet::MAX_FRAME_LEN;

/// Shortest read timeout handed to the OS; a zero timeout means "block
/// forever" to `set_read_timeout`.
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// A blocking, datagram-oriented UDP channel bound to one peer.
#[derive(Debug)]
pub struct UdpChannel {
    /// Address this socket is bound to (filled in after the OS assigns an
    /// ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
    buf: Vec<u8>,
}

impl UdpChannel {
    /// Bind to `local` without a fixed peer.
    ///
    /// Passing `127.0.0.1:0` lets the OS choose an ephemeral port.  The
    /// channel locks onto the first peer it hears from; see
    /// [`UdpChannel::connect`] to fix the peer up front.
    pub fn bind(local: impl ToSocketAddrs) -> io::Result<Self> {
        let inner = UdpSocket::bind(local)?;
        let local_addr = inner.local_addr()?;
        Ok(Self {
            local_addr,
            inner,
            buf: vec![0u8; MAX_FRAME_LEN],
        })
    }

    /// Restrict traffic to `peer`.
    pub fn connect(&mut self, peer: impl ToSocketAddrs) -> io::Result<()> {
        self.inner.connect(peer)
    }

    /// The connected peer, if any.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.inner.peer_addr().ok()
    }
}

/// Returns true if the error means the read timeout elapsed.
fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// An ICMP port-unreachable reported on a connected socket.  The datagram
/// is simply lost as far as the protocol is concerned.
fn is_refused(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::ConnectionRefused
}

impl Channel for UdpChannel {
    fn transmit(&mut self, datagram: &[u8]) -> io::Result<()> {
        match self.inner.send(datagram) {
            Ok(_) => Ok(()),
            Err(e) if is_refused(&e) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn receive(&mut self) -> io::Result<Option<Vec<u8>>> {
        if self.peer_addr().is_some() {
            return match self.inner.recv(&mut self.buf) {
                Ok(n) => Ok(Some(self.buf[..n].to_vec())),
                Err(e) if is_timeout(&e) || is_refused(&e) => Ok(None),
                Err(e) => Err(e),
            };
        }
        match self.inner.recv_from(&mut self.buf) {
            Ok((n, from)) => {
                log::debug!("[arq] locking onto peer {from}");
                self.inner.connect(from)?;
                Ok(Some(self.buf[..n].to_vec()))
            }
            Err(e) if is_timeout(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.inner
            .set_read_timeout(Some(timeout.max(MIN_READ_TIMEOUT)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (UdpChannel, UdpChannel) {
        let mut a = UdpChannel::bind("127.0.0.1:0").expect("bind a");
        let mut b = UdpChannel::bind("127.0.0.1:0").expect("bind b");
        a.connect(b.local_addr).expect("connect a");
        b.connect(a.local_addr).expect("connect b");
        (a, b)
    }

    #[test]
    fn datagram_crosses_loopback() {
        let (mut a, mut b) = pair();
        b.set_timeout(Duration::from_secs(2)).unwrap();
        a.transmit(b"ping").unwrap();
        assert_eq!(b.receive().unwrap().as_deref(), Some(&b"ping"[..]));
    }

    #[test]
    fn receive_times_out_with_none() {
        let (_a, mut b) = pair();
        b.set_timeout(Duration::from_millis(20)).unwrap();
        assert_eq!(b.receive().unwrap(), None);
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let (_a, mut b) = pair();
        b.set_timeout(Duration::ZERO).unwrap();
        assert_eq!(b.receive().unwrap(), None);
    }

    #[test]
    fn unconnected_channel_locks_onto_first_peer() {
        let mut server = UdpChannel::bind("127.0.0.1:0").unwrap();
        let mut client = UdpChannel::bind("127.0.0.1:0").unwrap();
        client.connect(server.local_addr).unwrap();
        server.set_timeout(Duration::from_secs(2)).unwrap();
        client.set_timeout(Duration::from_secs(2)).unwrap();

        client.transmit(b"hello").unwrap();
        assert_eq!(server.receive().unwrap().as_deref(), Some(&b"hello"[..]));
        assert_eq!(server.peer_addr(), Some(client.local_addr));

        server.transmit(b"back").unwrap();
        assert_eq!(client.receive().unwrap().as_deref(), Some(&b"back"[..]));
    }
}
