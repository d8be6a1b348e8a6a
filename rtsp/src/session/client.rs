//! A single connected RTSP client and its negotiated transport.

use std::net::TcpStream;

pub type ClientId = u64;

/// The transport a client negotiated via SETUP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// No SETUP has succeeded yet.
    Undecided,
    /// RTP/RTCP carried inside the RTSP TCP connection (RFC 2326 §10.12).
    InterleavedTcp { rtp_channel: u8, rtcp_channel: u8 },
    /// RTP/RTCP carried over dedicated client UDP ports.
    Udp { rtp_port: u16, rtcp_port: u16 },
}

/// One accepted RTSP control connection and the state the handshake builds up.
pub struct ClientSession {
    pub id: ClientId,
    pub peer_ip: String,
    pub control: TcpStream,
    pub mode: TransportMode,
    pub playing: bool,
    pub session_token: String,
    /// Set once the peer's control socket returns EOF; the session is
    /// removed on the registry's next compaction pass.
    pub closed: bool,
    /// Bytes read so far for a request that hasn't seen `\r\n\r\n` yet.
    pub read_buffer: String,
}

impl ClientSession {
    pub fn new(id: ClientId, peer_ip: String, control: TcpStream, session_token: String) -> Self {
        ClientSession {
            id,
            peer_ip,
            control,
            mode: TransportMode::Undecided,
            playing: false,
            session_token,
            closed: false,
            read_buffer: String::new(),
        }
    }

    pub fn is_eligible_for_broadcast(&self) -> bool {
        self.playing && !self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{TcpListener, TcpStream};

    fn loopback_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (server, client)
    }

    #[test]
    fn test_new_session_starts_undecided_and_not_playing() {
        let (server, _client) = loopback_pair();
        let session = ClientSession::new(1, "127.0.0.1".to_string(), server, "12345".to_string());

        assert_eq!(session.mode, TransportMode::Undecided);
        assert!(!session.playing);
        assert!(!session.is_eligible_for_broadcast());
    }

    #[test]
    fn test_playing_and_open_session_is_broadcast_eligible() {
        let (server, _client) = loopback_pair();
        let mut session =
            ClientSession::new(1, "127.0.0.1".to_string(), server, "12345".to_string());
        session.playing = true;

        assert!(session.is_eligible_for_broadcast());

        session.closed = true;
        assert!(!session.is_eligible_for_broadcast());
    }
}
