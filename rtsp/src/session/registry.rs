//! Shared registry of connected RTSP clients.
//!
//! One coarse lock around insert/remove/iterate, sized for the handful of
//! simultaneous viewers an RTSP server expects (not a lock-free or sharded
//! design).

use crate::session::client::{ClientId, ClientSession};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct SessionRegistry {
    clients: Arc<Mutex<HashMap<ClientId, ClientSession>>>,
    next_id: Arc<AtomicU64>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry {
            clients: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn next_client_id(&self) -> ClientId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn insert(&self, session: ClientSession) {
        let id = session.id;
        if let Ok(mut clients) = self.clients.lock() {
            clients.insert(id, session);
        }
    }

    /// Runs `f` with exclusive access to one client's session, if present.
    pub fn with_client<F, R>(&self, id: ClientId, f: F) -> Option<R>
    where
        F: FnOnce(&mut ClientSession) -> R,
    {
        let mut clients = self.clients.lock().ok()?;
        clients.get_mut(&id).map(f)
    }

    /// Runs `f` against every session currently eligible for broadcast
    /// (playing and not closed), while holding the registry lock.
    pub fn for_each_playing<F>(&self, mut f: F)
    where
        F: FnMut(&mut ClientSession),
    {
        if let Ok(mut clients) = self.clients.lock() {
            for session in clients.values_mut() {
                if session.is_eligible_for_broadcast() {
                    f(session);
                }
            }
        }
    }

    /// Runs `f` against every client regardless of state; used by the event
    /// loop to poll control sockets for incoming requests.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&mut ClientSession),
    {
        if let Ok(mut clients) = self.clients.lock() {
            for session in clients.values_mut() {
                f(session);
            }
        }
    }

    /// Removes every session marked closed. Called once per event loop tick.
    pub fn compact(&self) -> usize {
        if let Ok(mut clients) = self.clients.lock() {
            let before = clients.len();
            clients.retain(|_, session| !session.closed);
            before - clients.len()
        } else {
            0
        }
    }

    pub fn len(&self) -> usize {
        self.clients.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
