//! Demo pull-client binary.
//!
//! CLI-argument parsing is an explicit external collaborator (see crate
//! docs), so the server URL is a fixed literal rather than parsed from
//! `std::env::args`; point it at a real `rtsp-server` instance before running.

use logging::{LogLevel, Logger};
use rtsp::RtspClient;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const SERVER_URL: &str = "rtsp://127.0.0.1:8554/live";

fn main() {
    let logger = initialize_logger();
    logger.info(&format!("rtsp-client connecting to {SERVER_URL}"));

    let nal_count = Arc::new(AtomicU64::new(0));
    let counter = nal_count.clone();
    let callback_logger = logger.for_component("Callback").unwrap_or_else(|_| logger.clone());

    let client = match RtspClient::connect(
        SERVER_URL,
        move |nal: &[u8]| {
            let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
            if n % 25 == 0 {
                callback_logger.debug(&format!("received NAL #{n} ({} bytes)", nal.len()));
            }
        },
        logger.for_component("Pull").unwrap_or_else(|_| logger.clone()),
    ) {
        Ok(client) => client,
        Err(e) => {
            logger.error(&format!("failed to connect: {e}"));
            std::process::exit(1);
        }
    };

    logger.info(&format!("session {} playing", client.session_token()));
    std::thread::sleep(Duration::from_secs(10));

    client.shutdown();
    logger.info(&format!("received {} NAL units total", nal_count.load(Ordering::Relaxed)));
}

fn initialize_logger() -> Logger {
    match Logger::with_component(
        "rtsp-client.log".into(),
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
