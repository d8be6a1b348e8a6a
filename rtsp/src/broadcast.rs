//! Fan-out of one RTP packet to every playing client.
//!
//! Lock the registry, iterate eligible sessions, send to each, tolerate
//! per-send failure without aborting the rest of the fan-out.

use crate::session::SessionRegistry;
use crate::transport::ClientTransport;
use crate::wire::RtpPacket;
use logging::Logger;
use std::net::UdpSocket;

/// Serializes `packet` once and writes it to every client whose SETUP
/// negotiated a transport and whose PLAY made it eligible. `udp_socket` is
/// the server's single socket bound to `server_port`; every UDP client's
/// datagrams go out through it, never through a socket of their own.
pub fn broadcast(registry: &SessionRegistry, packet: &RtpPacket, logger: &Logger, udp_socket: &UdpSocket) {
    let wire_bytes = packet.to_bytes();

    registry.for_each_playing(|session| {
        let transport = match ClientTransport::from_mode(session.mode, &session.peer_ip) {
            Ok(Some(transport)) => transport,
            Ok(None) => return,
            Err(e) => {
                logger.warn(&format!("transport resolution failed for client {}: {e}", session.id));
                return;
            }
        };

        if let Err(e) = transport.send(&wire_bytes, &mut session.control, udp_socket) {
            logger.warn(&format!("send to client {} failed: {e}", session.id));
        }
    });
}
