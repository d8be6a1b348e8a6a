//! RTSP request parsing and per-method response construction.
//!
//! Parses one request, dispatches on its method name, and builds the
//! matching response.

use crate::session::{ClientSession, TransportMode};
use sdp::{Attribute, MediaDescription, Origin, SessionDescriptionBuilder, Timing};
use std::collections::HashMap;

pub const SERVER_RTP_PORT: u16 = 20001;
pub const SERVER_RTCP_PORT: u16 = 20002;
const SESSION_TIMEOUT_SECS: u32 = 60;

/// One parsed RTSP request line plus headers; body is unused by any method
/// this server accepts.
#[derive(Debug, Clone)]
pub struct RtspRequest {
    pub method: String,
    pub url: String,
    pub cseq: String,
    pub headers: HashMap<String, String>,
}

impl RtspRequest {
    /// Parses `data` up to and including the terminating `\r\n\r\n`. Returns
    /// `None` if the request has no CSeq header — malformed requests get no
    /// response rather than tearing down the connection.
    pub fn parse(data: &str) -> Option<RtspRequest> {
        let mut lines = data.split("\r\n");
        let request_line = lines.next()?;
        let mut parts = request_line.split_whitespace();
        let method = parts.next()?.to_string();
        let url = parts.next()?.to_string();

        let mut headers = HashMap::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim().to_string(), value.trim().to_string());
            }
        }

        let cseq = headers.get("CSeq")?.clone();
        Some(RtspRequest {
            method,
            url,
            cseq,
            headers,
        })
    }
}

/// Builds the full response text (status line + headers + optional body) for
/// `request` against `session`, mutating `session`'s transport/playing state
/// as the relevant methods dictate. Returns `None` when the request should be
/// silently dropped (unsupported SETUP transport).
pub fn handle_request(request: &RtspRequest, session: &mut ClientSession) -> Option<String> {
    match request.method.as_str() {
        "OPTIONS" => Some(handle_options(request)),
        "DESCRIBE" => Some(handle_describe(request, session)),
        "SETUP" => handle_setup(request, session),
        "PLAY" => Some(handle_play(request, session)),
        "TEARDOWN" => Some(handle_teardown(request, session)),
        _ => Some(format!(
            "RTSP/1.0 551 Option not supported\r\nCSeq: {}\r\n\r\n",
            request.cseq
        )),
    }
}

fn handle_options(request: &RtspRequest) -> String {
    format!(
        "RTSP/1.0 200 OK\r\nCSeq: {}\r\nPublic: OPTIONS, DESCRIBE, SETUP, PLAY, TEARDOWN\r\n\r\n",
        request.cseq
    )
}

fn handle_describe(request: &RtspRequest, session: &ClientSession) -> String {
    let host = url_host(&request.url).unwrap_or_else(|| session.peer_ip.clone());
    let sdp = SessionDescriptionBuilder::new()
        .origin(Origin::anonymous(unix_time_like_id(), &host))
        .timing(Timing::default())
        .add_attribute(Attribute::value("control", "*"))
        .add_media(MediaDescription::h264_video(96, "track0"))
        .build()
        .to_string();

    format!(
        "RTSP/1.0 200 OK\r\nCSeq: {}\r\nContent-Base: {}\r\nContent-Type: application/sdp\r\nContent-Length: {}\r\n\r\n{}",
        request.cseq,
        request.url,
        sdp.len(),
        sdp
    )
}

fn handle_setup(request: &RtspRequest, session: &mut ClientSession) -> Option<String> {
    let transport_header = request.headers.get("Transport")?;

    if transport_header.contains("RTP/AVP/TCP") {
        let (rtp_channel, rtcp_channel) = parse_interleaved(transport_header)?;
        session.mode = TransportMode::InterleavedTcp {
            rtp_channel,
            rtcp_channel,
        };
        Some(format!(
            "RTSP/1.0 200 OK\r\nCSeq: {}\r\nTransport: RTP/AVP/TCP;unicast;interleaved={}-{}\r\nSession: {}\r\n\r\n",
            request.cseq, rtp_channel, rtcp_channel, session.session_token
        ))
    } else if transport_header.contains("RTP/AVP") {
        let (rtp_port, rtcp_port) = parse_client_ports(transport_header)?;
        session.mode = TransportMode::Udp {
            rtp_port,
            rtcp_port,
        };
        Some(format!(
            "RTSP/1.0 200 OK\r\nCSeq: {}\r\nTransport: RTP/AVP;unicast;client_port={}-{};server_port={}-{}\r\nSession: {}\r\n\r\n",
            request.cseq, rtp_port, rtcp_port, SERVER_RTP_PORT, SERVER_RTCP_PORT, session.session_token
        ))
    } else {
        None
    }
}

fn handle_play(request: &RtspRequest, session: &mut ClientSession) -> String {
    if let Some(error) = validate_session(request, session) {
        return error;
    }
    session.playing = true;
    format!(
        "RTSP/1.0 200 OK\r\nCSeq: {}\r\nRange: npt=0.000-\r\nSession: {}; timeout={}\r\n\r\n",
        request.cseq, session.session_token, SESSION_TIMEOUT_SECS
    )
}

fn handle_teardown(request: &RtspRequest, session: &mut ClientSession) -> String {
    if let Some(error) = validate_session(request, session) {
        return error;
    }
    session.playing = false;
    format!(
        "RTSP/1.0 200 OK\r\nCSeq: {}\r\nSession: {}\r\n\r\n",
        request.cseq, session.session_token
    )
}

/// Checks a `Session:` header against the token SETUP handed this client.
/// A missing header is tolerated (some clients omit it on PLAY); a present
/// but mismatched one gets RFC 2326's 454.
fn validate_session(request: &RtspRequest, session: &ClientSession) -> Option<String> {
    match request.headers.get("Session") {
        Some(token) if token != &session.session_token => Some(format!(
            "RTSP/1.0 454 Session Not Found\r\nCSeq: {}\r\n\r\n",
            request.cseq
        )),
        _ => None,
    }
}

/// Extracts `A` and `B` from a `Transport:` header's `interleaved=A-B` parameter.
fn parse_interleaved(transport: &str) -> Option<(u8, u8)> {
    parse_range_param(transport, "interleaved=")
}

/// Extracts `A` and `B` from a `Transport:` header's `client_port=A-B` parameter.
fn parse_client_ports(transport: &str) -> Option<(u16, u16)> {
    parse_range_param(transport, "client_port=")
}

fn parse_range_param<T: std::str::FromStr>(transport: &str, key: &str) -> Option<(T, T)> {
    let start = transport.find(key)? + key.len();
    let rest = &transport[start..];
    let end = rest.find(';').unwrap_or(rest.len());
    let (a, b) = rest[..end].split_once('-')?;
    Some((a.parse().ok()?, b.parse().ok()?))
}

fn url_host(url: &str) -> Option<String> {
    let after_scheme = url.split("://").nth(1)?;
    let host_port = after_scheme.split('/').next()?;
    let host = host_port.split(':').next()?;
    Some(host.to_string())
}

/// A `9<digits>` session id, the shape the DESCRIBE body's `o=` line expects;
/// real entropy comes from the caller-supplied seed, not wall-clock time.
fn unix_time_like_id() -> u64 {
    use rand::Rng;
    9_000_000_000 + rand::thread_rng().gen_range(0..1_000_000_000u64)
}
