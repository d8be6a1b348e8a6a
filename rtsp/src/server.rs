//! Public server entry point: accept loop, per-NAL publishing, shutdown.

use crate::broadcast;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::event_loop::EventLoop;
use crate::h264::H264Packetizer;
use crate::nal::NalFramer;
use crate::session::{ClientSession, SessionRegistry};
use logging::Logger;
use rand::Rng;
use std::net::{TcpListener, UdpSocket};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

const FRAMING_BUFFER_CAPACITY: usize = 1024 * 1024;
const RTSP_PAYLOAD_TYPE: u8 = 96;

/// Owns the accept loop, the control-socket event loop, and the H.264
/// framing/packetizing pipeline that `publish` feeds. One instance serves
/// one stream to any number of connected clients.
pub struct RtspServer {
    registry: SessionRegistry,
    event_loop: Option<EventLoop>,
    listener_thread: Option<thread::JoinHandle<()>>,
    accept_quit: std::sync::Arc<std::sync::atomic::AtomicBool>,
    framer: Mutex<NalFramer>,
    packetizer: Mutex<H264Packetizer>,
    logger: Logger,
    port: u16,
    rtp_socket: UdpSocket,
    /// Bound at construction but never read from; see Non-goals.
    #[allow(dead_code)]
    rtcp_socket: UdpSocket,
}

impl RtspServer {
    /// Binds the RTSP control listener, the single RTP UDP socket every
    /// SETUP'd UDP client is fanned out through, the idle RTCP socket, and
    /// starts the event loop thread.
    pub fn new(config: ServerConfig, logger: Logger) -> Result<Self> {
        let registry = SessionRegistry::new();
        let listener = TcpListener::bind(("0.0.0.0", config.rtsp_port))?;
        listener.set_nonblocking(true)?;
        let port = listener.local_addr()?.port();

        let rtp_socket = UdpSocket::bind(("0.0.0.0", config.rtp_port))?;
        rtp_socket.set_nonblocking(true)?;
        let rtcp_socket = UdpSocket::bind(("0.0.0.0", config.rtcp_port))?;
        rtcp_socket.set_nonblocking(true)?;

        logger.info(&format!("RTSP control listener on port {port}"));
        logger.info(&format!(
            "RTP UDP socket bound to port {}",
            rtp_socket.local_addr()?.port()
        ));

        let accept_quit = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let accept_registry = registry.clone();
        let accept_logger = logger.for_component("Accept").unwrap_or_else(|_| logger.clone());
        let thread_quit = accept_quit.clone();

        let listener_thread = thread::spawn(move || {
            accept_loop(listener, accept_registry, thread_quit, accept_logger);
        });

        let event_loop_logger = logger.for_component("EventLoop").unwrap_or_else(|_| logger.clone());
        let event_loop = EventLoop::spawn(
            registry.clone(),
            Duration::from_millis(config.poll_interval_ms),
            event_loop_logger,
        );

        let packetizer = H264Packetizer::new(RTSP_PAYLOAD_TYPE, config.max_payload_size, config.fps);

        Ok(RtspServer {
            registry,
            event_loop: Some(event_loop),
            listener_thread: Some(listener_thread),
            accept_quit,
            framer: Mutex::new(NalFramer::new(FRAMING_BUFFER_CAPACITY)),
            packetizer: Mutex::new(packetizer),
            logger,
            port,
            rtp_socket,
            rtcp_socket,
        })
    }

    /// The control listener's bound port; useful when constructed with
    /// `rtsp_port: 0` to let the OS pick an ephemeral port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The RTP UDP socket's bound port; useful when constructed with
    /// `rtp_port: 0` to let the OS pick an ephemeral port.
    pub fn rtp_port(&self) -> u16 {
        self.rtp_socket.local_addr().map(|a| a.port()).unwrap_or(0)
    }

    /// Feeds `data` into the elementary-stream framer and broadcasts every
    /// NAL unit it completes. `data.is_empty()` flushes any buffered NAL and
    /// the packetizer's pending unit; per the core contract this is advisory
    /// and always reports zero bytes consumed. Returns the number of bytes
    /// accepted by the framer (not the number broadcast).
    pub fn publish(&self, data: &[u8]) -> Result<usize> {
        let consumed = data.len();
        let nals = {
            let mut framer = self.framer.lock().unwrap();
            framer.push(data)?
        };

        let mut packetizer = self.packetizer.lock().unwrap();
        for nal in nals {
            for packet in packetizer.push_nal(nal) {
                broadcast::broadcast(&self.registry, &packet, &self.logger, &self.rtp_socket);
            }
        }

        if data.is_empty() {
            for packet in packetizer.flush() {
                broadcast::broadcast(&self.registry, &packet, &self.logger, &self.rtp_socket);
            }
            return Ok(0);
        }

        Ok(consumed)
    }

    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    /// Stops the accept thread and the event loop, joining both.
    pub fn shutdown(mut self) {
        self.accept_quit.store(true, std::sync::atomic::Ordering::Relaxed);
        if let Some(handle) = self.listener_thread.take() {
            let _ = handle.join();
        }
        if let Some(event_loop) = self.event_loop.take() {
            event_loop.shutdown();
        }
        self.logger.info("server shut down");
    }
}

fn accept_loop(
    listener: TcpListener,
    registry: SessionRegistry,
    quit: std::sync::Arc<std::sync::atomic::AtomicBool>,
    logger: Logger,
) {
    while !quit.load(std::sync::atomic::Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, addr)) => {
                if let Err(e) = stream.set_nonblocking(true) {
                    logger.warn(&format!("failed to set client socket non-blocking: {e}"));
                    continue;
                }
                let id = registry.next_client_id();
                let token = random_session_token();
                logger.info(&format!("accepted client {id} from {addr}"));
                registry.insert(ClientSession::new(id, addr.ip().to_string(), stream, token));
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                logger.error(&format!("accept failed: {e}"));
                thread::sleep(Duration::from_millis(50));
            }
        }
    }
}

/// An 8-digit ASCII session token, generated fresh per client (see DESIGN.md
/// for why this isn't a fixed literal).
fn random_session_token() -> String {
    rand::thread_rng().gen_range(10_000_000u32..100_000_000).to_string()
}
