//! Demo RTSP server binary.
//!
//! CLI-argument parsing and file-based frame ingestion are explicit external
//! collaborators (see crate docs), so this binary wires a synthetic Annex-B
//! frame source instead of reading a real `.h264` file.

use logging::{LogLevel, Logger};
use rtsp::{RtspServer, ServerConfig};
use std::thread;
use std::time::Duration;

fn main() {
    let logger = initialize_logger();
    logger.info("rtsp-server starting...");

    let config = ServerConfig::default().with_rtsp_port(8554);
    let server = match RtspServer::new(config, logger.for_component("Server").unwrap_or_else(|_| logger.clone())) {
        Ok(server) => server,
        Err(e) => {
            logger.error(&format!("failed to start server: {e}"));
            std::process::exit(1);
        }
    };

    logger.info("publishing synthetic H.264 stream on rtsp://0.0.0.0:8554/live");
    run_synthetic_source(&server, &logger);

    server.shutdown();
}

fn initialize_logger() -> Logger {
    match Logger::with_component(
        "rtsp-server.log".into(),
        LogLevel::Info,
        "Main".to_string(),
        true,
    ) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("failed to create logger: {e}");
            std::process::exit(1);
        }
    }
}

/// Feeds a minimal, repeating Annex-B elementary stream (SPS, PPS, then an
/// oversized synthetic slice NAL to exercise FU-A) to `server.publish` at a
/// fixed cadence, standing in for the real frame source this crate treats as
/// an external collaborator.
fn run_synthetic_source(server: &RtspServer, logger: &Logger) {
    const SPS: &[u8] = &[0x67, 0x42, 0x00, 0x1E, 0xAB, 0x12, 0x34];
    const PPS: &[u8] = &[0x68, 0xCE, 0x3C, 0x80];
    const START_CODE: &[u8] = &[0x00, 0x00, 0x00, 0x01];

    let mut slice = vec![0x65u8];
    slice.extend(std::iter::repeat_n(0xA5u8, 2000));

    let mut frame_count = 0u64;
    loop {
        let mut chunk = Vec::new();
        chunk.extend_from_slice(START_CODE);
        chunk.extend_from_slice(SPS);
        chunk.extend_from_slice(START_CODE);
        chunk.extend_from_slice(PPS);
        chunk.extend_from_slice(START_CODE);
        chunk.extend_from_slice(&slice);
        chunk.extend_from_slice(START_CODE);

        if let Err(e) = server.publish(&chunk) {
            logger.error(&format!("publish failed: {e}"));
            break;
        }

        frame_count += 1;
        if frame_count % 25 == 0 {
            logger.debug(&format!("published {frame_count} frames, {} clients connected", server.client_count()));
        }

        thread::sleep(Duration::from_millis(40));
    }
}
