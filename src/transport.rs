use anyhow::{anyhow, Context, Result};
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

/// Where encoded datagrams go
pub trait Transport {
    fn send(&mut self, datagram: &[u8]) -> io::Result<()>;
}

/// Fire-and-forget UDP sender to a single destination
pub struct UdpTransport {
    socket: UdpSocket,
    dest: SocketAddr,
}

impl UdpTransport {
    /// Resolve `host:port` once and bind an ephemeral local socket.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let dest = (host, port)
            .to_socket_addrs()
            .with_context(|| format!("Failed to resolve {}:{}", host, port))?
            .next()
            .ok_or_else(|| anyhow!("No address found for {}:{}", host, port))?;

        let bind_addr = if dest.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr)
            .with_context(|| format!("Failed to bind UDP socket on {}", bind_addr))?;

        log::info!("UDP sender bound to {}, streaming to {}", socket.local_addr()?, dest);
        Ok(Self { socket, dest })
    }

    pub fn dest(&self) -> SocketAddr {
        self.dest
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        let sent = self.socket.send_to(datagram, self.dest)?;
        if sent != datagram.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short send: {} of {} bytes", sent, datagram.len()),
            ));
        }
        Ok(())
    }
}
