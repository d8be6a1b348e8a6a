//! SDP attribute field representation.

/// An `a=` line: either a flag (`a=recvonly`) or a key-value pair (`a=rtpmap:96 H264/90000`).
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

impl Attribute {
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(val) => write!(f, "a={}:{}\r\n", self.name, val),
            None => write!(f, "a={}\r\n", self.name),
        }
    }
}
