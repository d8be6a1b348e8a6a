//! Per-client RTP delivery: interleaved TCP framing or the server's shared UDP socket.
//!
//! The interleaved variant writes length-prefixed frames directly onto the
//! client's existing control connection (RFC 2326 §10.12); the UDP variant
//! resolves only the client's remote address and sends through the one
//! socket the server bound to `server_port` at construction (§4.3, §6) —
//! it never owns or opens a socket itself.

use crate::error::{Result, RtspError};
use crate::session::TransportMode;
use crate::wire::InterleavedHeader;
use std::io::Write;
use std::net::{SocketAddr, TcpStream, UdpSocket};

/// How an [`crate::h264::H264Packetizer`]-produced RTP packet is delivered to
/// one client, resolved once that client's SETUP negotiation completes.
pub enum ClientTransport {
    InterleavedTcp { rtp_channel: u8 },
    Udp { remote: SocketAddr },
}

impl ClientTransport {
    pub fn from_mode(mode: TransportMode, client_ip: &str) -> Result<Option<Self>> {
        match mode {
            TransportMode::Undecided => Ok(None),
            TransportMode::InterleavedTcp { rtp_channel, .. } => {
                Ok(Some(ClientTransport::InterleavedTcp { rtp_channel }))
            }
            TransportMode::Udp { rtp_port, .. } => {
                let remote: SocketAddr = format!("{client_ip}:{rtp_port}")
                    .parse()
                    .map_err(|e| RtspError::Transport(format!("bad client address: {e}")))?;
                Ok(Some(ClientTransport::Udp { remote }))
            }
        }
    }

    /// Sends one RTP packet's wire bytes to this client: onto `control` when
    /// interleaved (the RTSP connection owns that stream), or through
    /// `udp_socket` — the server's single, persistently bound RTP socket —
    /// otherwise.
    pub fn send(&self, rtp_bytes: &[u8], control: &mut TcpStream, udp_socket: &UdpSocket) -> Result<()> {
        match self {
            ClientTransport::InterleavedTcp { rtp_channel } => {
                let framed = InterleavedHeader::wrap(*rtp_channel, rtp_bytes);
                control.write_all(&framed)?;
                Ok(())
            }
            ClientTransport::Udp { remote } => {
                udp_socket.send_to(rtp_bytes, remote)?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn loopback() -> TcpStream {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (_server, _) = listener.accept().unwrap();
        client
    }

    fn ephemeral_udp_socket() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").unwrap()
    }

    #[test]
    fn test_undecided_mode_yields_no_transport() {
        let transport = ClientTransport::from_mode(TransportMode::Undecided, "127.0.0.1").unwrap();
        assert!(transport.is_none());
    }

    #[test]
    fn test_interleaved_send_writes_framed_bytes() {
        let transport = ClientTransport::from_mode(
            TransportMode::InterleavedTcp {
                rtp_channel: 0,
                rtcp_channel: 1,
            },
            "127.0.0.1",
        )
        .unwrap()
        .unwrap();

        let mut control = loopback();
        let udp_socket = ephemeral_udp_socket();
        transport.send(&[0xAA, 0xBB], &mut control, &udp_socket).unwrap();
    }

    #[test]
    fn test_udp_transport_resolves_remote_address() {
        let transport = ClientTransport::from_mode(
            TransportMode::Udp {
                rtp_port: 30000,
                rtcp_port: 30001,
            },
            "127.0.0.1",
        )
        .unwrap()
        .unwrap();

        let mut control = loopback();
        let udp_socket = ephemeral_udp_socket();
        assert!(transport.send(&[0x01], &mut control, &udp_socket).is_ok());
    }

    #[test]
    fn test_udp_send_uses_the_shared_socket_as_its_source() {
        // The sender's source port observed by a real peer must be the
        // server's persistently bound socket, not a fresh ephemeral one.
        let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
        let peer_addr = peer.local_addr().unwrap();
        peer.set_nonblocking(true).unwrap();

        let udp_socket = ephemeral_udp_socket();
        let expected_source = udp_socket.local_addr().unwrap();

        let transport = ClientTransport::Udp { remote: peer_addr };
        let mut control = loopback();
        transport.send(&[0x42], &mut control, &udp_socket).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(20));
        let mut buf = [0u8; 8];
        let (n, from) = peer.recv_from(&mut buf).unwrap();
        assert_eq!(n, 1);
        assert_eq!(from, expected_source);
    }
}
