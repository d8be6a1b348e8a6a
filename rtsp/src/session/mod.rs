//! Connected-client state: one [`ClientSession`] per accepted control
//! connection, tracked in a shared [`SessionRegistry`].

pub mod client;
pub mod registry;

pub use client::{ClientId, ClientSession, TransportMode};
pub use registry::SessionRegistry;
