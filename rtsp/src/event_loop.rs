//! The server's single control-socket worker thread.
//!
//! One thread owns every client's RTSP control socket. Each tick it makes one
//! non-blocking recv per client, feeds complete requests to [`rtsp_engine`],
//! and writes back whatever response comes out, then compacts the registry.
//! Readiness multiplexing is realized with non-blocking sockets plus
//! `WouldBlock` tolerance rather than a `select()`/epoll reactor crate.

use crate::rtsp_engine::{self, RtspRequest};
use crate::session::SessionRegistry;
use logging::Logger;
use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const READ_CHUNK_SIZE: usize = 4096;

pub struct EventLoop {
    quit: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl EventLoop {
    /// Spawns the worker thread. `poll_interval` is the per-tick sleep when
    /// there is nothing to read; 50 ms is the historical cadence sockets get
    /// another chance at a read.
    pub fn spawn(registry: SessionRegistry, poll_interval: Duration, logger: Logger) -> Self {
        let quit = Arc::new(AtomicBool::new(false));
        let thread_quit = quit.clone();

        let handle = thread::spawn(move || {
            logger.info("event loop started");
            while !thread_quit.load(Ordering::Relaxed) {
                tick(&registry, &logger);
                thread::sleep(poll_interval);
            }
            logger.info("event loop stopped");
        });

        EventLoop {
            quit,
            handle: Some(handle),
        }
    }

    /// Signals the loop to stop and joins the thread. Any in-flight recv
    /// completes on its own before the next quit check, so this never blocks
    /// longer than roughly one poll interval.
    pub fn shutdown(mut self) {
        self.quit.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn tick(registry: &SessionRegistry, logger: &Logger) {
    registry.for_each(|session| {
        let mut buf = [0u8; READ_CHUNK_SIZE];
        match session.control.read(&mut buf) {
            Ok(0) => {
                session.closed = true;
            }
            Ok(n) => {
                session.read_buffer.push_str(&String::from_utf8_lossy(&buf[..n]));
                drain_requests(session, logger);
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {}
            Err(e) => {
                logger.warn(&format!("control socket recv error: {e}"));
            }
        }
    });

    let removed = registry.compact();
    if removed > 0 {
        logger.debug(&format!("compacted {removed} closed session(s)"));
    }
}

fn drain_requests(session: &mut crate::session::ClientSession, logger: &Logger) {
    while let Some(boundary) = session.read_buffer.find("\r\n\r\n") {
        let request_text = session.read_buffer[..boundary + 4].to_string();
        session.read_buffer.drain(..boundary + 4);

        match RtspRequest::parse(&request_text) {
            Some(request) => {
                if let Some(response) = rtsp_engine::handle_request(&request, session)
                    && let Err(e) = session.control.write_all(response.as_bytes())
                {
                    logger.warn(&format!("control socket send error: {e}"));
                    session.closed = true;
                }
            }
            None => logger.warn("dropped malformed RTSP request (missing CSeq)"),
        }
    }
}
