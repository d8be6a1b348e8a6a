//! SDP origin field representation.

/// The `o=` field: `o=<username> <sess-id> <sess-version> <nettype> <addrtype> <unicast-address>`.
#[derive(Debug, Clone)]
pub struct Origin {
    pub username: String,
    pub session_id: u64,
    pub session_version: u64,
    pub network_type: String,
    pub address_type: String,
    pub unicast_address: String,
}

impl Origin {
    /// Builds an anonymous ("-") origin for the given session id and host, as used
    /// in a DESCRIBE response (the session id doubles as a stream-instance marker).
    pub fn anonymous(session_id: u64, unicast_address: impl Into<String>) -> Self {
        Self {
            username: "-".to_string(),
            session_id,
            session_version: 1,
            network_type: "IN".to_string(),
            address_type: "IP4".to_string(),
            unicast_address: unicast_address.into(),
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "o={} {} {} {} {} {}\r\n",
            self.username,
            self.session_id,
            self.session_version,
            self.network_type,
            self.address_type,
            self.unicast_address
        )
    }
}
