//! RTSP 1.0 live H.264 streaming server and pull client.
//!
//! Three subsystems compose the whole: [`nal`] frames an Annex-B elementary
//! stream into NAL units, [`h264`] packetizes those into RTP (RFC 6184) and
//! reassembles them back, and [`rtsp_engine`]/[`event_loop`]/[`broadcast`]
//! drive the RTSP handshake and per-client fan-out. [`server`] and [`client`]
//! wire those together into the two public entry points.

pub mod broadcast;
pub mod client;
pub mod config;
pub mod error;
pub mod event_loop;
pub mod h264;
pub mod nal;
pub mod rtsp_engine;
pub mod server;
pub mod session;
pub mod transport;
pub mod wire;

pub use client::{RtspClient, TransportPreference};
pub use config::ServerConfig;
pub use error::{Result, RtspError};
pub use server::RtspServer;
