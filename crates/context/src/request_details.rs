use std::net::SocketAddr;

/// Connection details of the request that triggered a switch, kept for auditing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestDetails {
    pub remote_address: Option<SocketAddr>,
}

impl RequestDetails {
    pub fn new(remote_address: SocketAddr) -> Self {
        Self {
            remote_address: Some(remote_address),
        }
    }
}
