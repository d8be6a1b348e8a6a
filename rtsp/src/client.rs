//! Pull client: performs the OPTIONS/DESCRIBE/SETUP/PLAY handshake against a
//! publishing server, then reassembles the received RTP stream back into
//! Annex-B H.264 and hands it to a caller-supplied callback on a dedicated
//! receive thread.

use crate::error::{Result, RtspError};
use crate::h264::H264Depacketizer;
use crate::wire::{InterleavedHeader, RtpPacket};
use logging::Logger;
use std::io::{Read, Write};
use std::net::{TcpStream, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const REQUEST_BUF_SIZE: usize = 1024;
const RECV_BUF_SIZE: usize = 512 * 1024;
const UDP_RECV_BUF_SIZE: usize = 64 * 1024;
const DEFAULT_RTSP_PORT: u16 = 554;

/// Destination for reassembled Annex-B bytes; runs on the client's receive
/// thread, so it must be `Send`.
pub type FrameCallback = Box<dyn Fn(&[u8]) + Send + 'static>;

/// Parsed `rtsp://host[:port]/path` components used to drive the handshake.
struct RtspUrl {
    host: String,
    port: u16,
    raw: String,
}

impl RtspUrl {
    fn parse(url: &str) -> Result<Self> {
        let after_scheme = url
            .strip_prefix("rtsp://")
            .ok_or_else(|| RtspError::Transport(format!("not an rtsp:// url: {url}")))?;
        let host_port = after_scheme.split('/').next().unwrap_or(after_scheme);

        let (host, port) = match host_port.split_once(':') {
            Some((host, port_str)) => {
                let port = port_str
                    .parse()
                    .map_err(|_| RtspError::Transport(format!("bad port in url: {url}")))?;
                (host.to_string(), port)
            }
            None => (host_port.to_string(), DEFAULT_RTSP_PORT),
        };

        if host.is_empty() {
            return Err(RtspError::Transport(format!("missing host in url: {url}")));
        }

        Ok(RtspUrl {
            host,
            port,
            raw: url.to_string(),
        })
    }
}

/// Which `Transport:` the client requests in SETUP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportPreference {
    InterleavedTcp,
    Udp,
}

const UDP_CLIENT_RTP_PORT: u16 = 30000;
const UDP_CLIENT_RTCP_PORT: u16 = 30001;

/// Transport the receive loop reassembles packets from; resolved once from
/// the SETUP response's `Transport:` header.
enum IngestTransport {
    InterleavedTcp,
    Udp { socket: UdpSocket },
}

/// A connected pull-client session: owns the control connection and the
/// detached receive thread that feeds `callback`.
pub struct RtspClient {
    control: TcpStream,
    session_token: String,
    cseq: Arc<Mutex<u32>>,
    quit: Arc<AtomicBool>,
    receive_thread: Option<thread::JoinHandle<()>>,
    logger: Logger,
    url: String,
}

impl RtspClient {
    /// Runs OPTIONS, DESCRIBE, SETUP (requesting `RTP/AVP/TCP` interleaved
    /// transport), then PLAY, and spawns the receive thread. `callback` is
    /// invoked once per reassembled NAL unit, prefixed with its Annex-B
    /// start code. Equivalent to
    /// `connect_with_transport(url, TransportPreference::InterleavedTcp, ...)`.
    pub fn connect<F>(url: &str, callback: F, logger: Logger) -> Result<Self>
    where
        F: Fn(&[u8]) + Send + 'static,
    {
        Self::connect_with_transport(url, TransportPreference::InterleavedTcp, callback, logger)
    }

    /// Same handshake as [`Self::connect`], requesting UDP transport instead
    /// when `transport` is [`TransportPreference::Udp`].
    pub fn connect_with_transport<F>(
        url: &str,
        transport: TransportPreference,
        callback: F,
        logger: Logger,
    ) -> Result<Self>
    where
        F: Fn(&[u8]) + Send + 'static,
    {
        let parsed = RtspUrl::parse(url)?;
        let mut control = TcpStream::connect((parsed.host.as_str(), parsed.port))?;
        logger.info(&format!("connected to {}:{}", parsed.host, parsed.port));

        let mut cseq = 1u32;
        send_options(&mut control, &parsed.raw, cseq)?;
        cseq += 1;
        send_describe(&mut control, &parsed.raw, cseq)?;
        cseq += 1;
        let session_token = send_setup(&mut control, &parsed.raw, cseq, transport)?;
        cseq += 1;
        send_play(&mut control, &parsed.raw, cseq, &session_token)?;

        let ingest_transport = match transport {
            TransportPreference::InterleavedTcp => IngestTransport::InterleavedTcp,
            TransportPreference::Udp => {
                let socket = UdpSocket::bind(("0.0.0.0", UDP_CLIENT_RTP_PORT))?;
                IngestTransport::Udp { socket }
            }
        };
        let receive_control = control.try_clone()?;
        let quit = Arc::new(AtomicBool::new(false));
        let thread_quit = quit.clone();
        let receive_logger = logger.for_component("PullReceive").unwrap_or_else(|_| logger.clone());
        let boxed_callback: FrameCallback = Box::new(callback);

        let receive_thread = thread::spawn(move || {
            receive_loop(receive_control, ingest_transport, boxed_callback, thread_quit, receive_logger);
        });

        Ok(RtspClient {
            control,
            session_token,
            cseq: Arc::new(Mutex::new(cseq)),
            quit,
            receive_thread: Some(receive_thread),
            logger,
            url: parsed.raw,
        })
    }

    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    /// Sends TEARDOWN and stops the receive thread, joining it.
    pub fn shutdown(mut self) {
        self.teardown_and_join();
    }

    fn teardown_and_join(&mut self) {
        let cseq = {
            let mut guard = self.cseq.lock().unwrap();
            *guard += 1;
            *guard
        };
        if let Err(e) = send_teardown(&mut self.control, &self.url, cseq, &self.session_token) {
            self.logger.warn(&format!("TEARDOWN failed: {e}"));
        }

        self.quit.store(true, Ordering::Relaxed);
        if let Some(handle) = self.receive_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RtspClient {
    fn drop(&mut self) {
        if self.receive_thread.is_some() {
            self.teardown_and_join();
        }
    }
}

fn send_options(control: &mut TcpStream, url: &str, cseq: u32) -> Result<()> {
    let request = format!("OPTIONS {url} RTSP/1.0\r\nCSeq: {cseq}\r\n\r\n");
    send_request(control, &request)?;
    read_response(control)?;
    Ok(())
}

fn send_describe(control: &mut TcpStream, url: &str, cseq: u32) -> Result<()> {
    let request =
        format!("DESCRIBE {url} RTSP/1.0\r\nCSeq: {cseq}\r\nAccept: application/sdp\r\n\r\n");
    send_request(control, &request)?;
    read_response(control)?;
    Ok(())
}

/// Requests the given transport and extracts the `Session:` token from the
/// response.
fn send_setup(
    control: &mut TcpStream,
    url: &str,
    cseq: u32,
    transport: TransportPreference,
) -> Result<String> {
    let transport_header = match transport {
        TransportPreference::InterleavedTcp => {
            "Transport: RTP/AVP/TCP;unicast;interleaved=0-1".to_string()
        }
        TransportPreference::Udp => format!(
            "Transport: RTP/AVP;unicast;client_port={UDP_CLIENT_RTP_PORT}-{UDP_CLIENT_RTCP_PORT}"
        ),
    };
    let request = format!("SETUP {url} RTSP/1.0\r\nCSeq: {cseq}\r\n{transport_header}\r\n\r\n");
    send_request(control, &request)?;
    let response = read_response(control)?;

    response
        .lines()
        .find_map(|line| line.strip_prefix("Session:"))
        .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
        .ok_or_else(|| RtspError::Protocol("SETUP response missing Session header".to_string()))
}

fn send_play(control: &mut TcpStream, url: &str, cseq: u32, session_token: &str) -> Result<()> {
    let request = format!(
        "PLAY {url} RTSP/1.0\r\nCSeq: {cseq}\r\nSession: {session_token}\r\nRange: npt=0.000-\r\n\r\n"
    );
    send_request(control, &request)?;
    read_response(control)?;
    Ok(())
}

fn send_teardown(control: &mut TcpStream, url: &str, cseq: u32, session_token: &str) -> Result<()> {
    let request =
        format!("TEARDOWN {url} RTSP/1.0\r\nCSeq: {cseq}\r\nSession: {session_token}\r\n\r\n");
    send_request(control, &request)?;
    read_response(control)?;
    Ok(())
}

fn send_request(control: &mut TcpStream, request: &str) -> Result<()> {
    control.write_all(request.as_bytes())?;
    Ok(())
}

fn read_response(control: &mut TcpStream) -> Result<String> {
    let mut buf = vec![0u8; REQUEST_BUF_SIZE];
    let n = control.read(&mut buf)?;
    if n == 0 {
        return Err(RtspError::Protocol("server closed control connection".to_string()));
    }
    Ok(String::from_utf8_lossy(&buf[..n]).to_string())
}

/// Detached receive thread body: reads whatever transport was negotiated and
/// hands each reassembled NAL unit to `callback`. Runs until `quit` is set.
fn receive_loop(
    mut control: TcpStream,
    transport: IngestTransport,
    callback: FrameCallback,
    quit: Arc<AtomicBool>,
    logger: Logger,
) {
    control
        .set_read_timeout(Some(Duration::from_millis(100)))
        .unwrap_or_else(|e| logger.warn(&format!("failed to set read timeout: {e}")));

    let mut depacketizer = H264Depacketizer::new();

    match transport {
        IngestTransport::InterleavedTcp => {
            run_interleaved_loop(&mut control, &mut depacketizer, &callback, &quit, &logger)
        }
        IngestTransport::Udp { socket } => {
            socket
                .set_read_timeout(Some(Duration::from_millis(100)))
                .unwrap_or_else(|e| logger.warn(&format!("failed to set UDP read timeout: {e}")));
            run_udp_loop(&socket, &mut depacketizer, &callback, &quit, &logger)
        }
    }
}

fn run_interleaved_loop(
    control: &mut TcpStream,
    depacketizer: &mut H264Depacketizer,
    callback: &FrameCallback,
    quit: &Arc<AtomicBool>,
    logger: &Logger,
) {
    let mut buf = vec![0u8; RECV_BUF_SIZE];
    let mut pending: Vec<u8> = Vec::new();

    while !quit.load(Ordering::Relaxed) {
        let n = match control.read(&mut buf) {
            Ok(0) => {
                logger.info("control connection closed by server");
                break;
            }
            Ok(n) => n,
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => {
                logger.warn(&format!("recv failed: {e}"));
                continue;
            }
        };

        pending.extend_from_slice(&buf[..n]);
        consume_interleaved_envelopes(&mut pending, depacketizer, callback, logger);
    }
}

/// Drains as many complete `$ | channel | len | rtp` envelopes as `pending`
/// holds, leaving any trailing partial envelope for the next read.
fn consume_interleaved_envelopes(
    pending: &mut Vec<u8>,
    depacketizer: &mut H264Depacketizer,
    callback: &FrameCallback,
    logger: &Logger,
) {
    let mut offset = 0;
    while offset + InterleavedHeader::SIZE <= pending.len() {
        let header = match InterleavedHeader::from_bytes(&pending[offset..]) {
            Ok(header) => header,
            Err(e) => {
                logger.warn(&format!("bad interleaved envelope, resyncing: {e}"));
                pending.clear();
                return;
            }
        };

        let frame_end = offset + InterleavedHeader::SIZE + header.length as usize;
        if frame_end > pending.len() {
            break;
        }

        let rtp_bytes = &pending[offset + InterleavedHeader::SIZE..frame_end];
        emit_from_rtp_bytes(rtp_bytes, depacketizer, callback, logger);
        offset = frame_end;
    }

    pending.drain(..offset);
}

fn run_udp_loop(
    socket: &UdpSocket,
    depacketizer: &mut H264Depacketizer,
    callback: &FrameCallback,
    quit: &Arc<AtomicBool>,
    logger: &Logger,
) {
    let mut buf = vec![0u8; UDP_RECV_BUF_SIZE];
    while !quit.load(Ordering::Relaxed) {
        match socket.recv(&mut buf) {
            Ok(n) if n > 0 => emit_from_rtp_bytes(&buf[..n], depacketizer, callback, logger),
            Ok(_) => {}
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => logger.warn(&format!("UDP recv failed: {e}")),
        }
    }
}

/// Parses one RTP packet's wire bytes, feeds it to the depacketizer, and
/// invokes `callback` on every completed NAL unit.
fn emit_from_rtp_bytes(
    rtp_bytes: &[u8],
    depacketizer: &mut H264Depacketizer,
    callback: &FrameCallback,
    logger: &Logger,
) {
    let packet = match RtpPacket::from_bytes(rtp_bytes) {
        Ok(packet) => packet,
        Err(e) => {
            logger.warn(&format!("dropping malformed RTP packet: {e}"));
            return;
        }
    };

    if let Some(nal) = depacketizer.process_packet(&packet) {
        callback(&nal);
    }
}
