use std::fmt;
use std::str::FromStr;

use crate::error::TransportError;

/// Where a serial bridge can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `host:port` of a TCP serial server.
    Tcp(String),
    /// Filesystem path of a Unix domain socket bridge.
    #[cfg(unix)]
    Unix(std::path::PathBuf),
}

impl Endpoint {
    /// Parse `tcp://host:port`, `unix:/path` (or `unix:///path`), or a bare `host:port`.
    pub fn parse(input: &str) -> Result<Self, TransportError> {
        let input = input.trim();
        if let Some(addr) = input.strip_prefix("tcp://") {
            return tcp(addr, input);
        }
        if let Some(path) = input.strip_prefix("unix:") {
            let path = path.strip_prefix("//").unwrap_or(path);
            return unix(path, input);
        }
        tcp(input, input)
    }
}

fn tcp(addr: &str, original: &str) -> Result<Endpoint, TransportError> {
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
            Ok(Endpoint::Tcp(addr.to_string()))
        }
        _ => Err(TransportError::InvalidEndpoint(original.to_string())),
    }
}

#[cfg(unix)]
fn unix(path: &str, original: &str) -> Result<Endpoint, TransportError> {
    if path.is_empty() {
        return Err(TransportError::InvalidEndpoint(original.to_string()));
    }
    Ok(Endpoint::Unix(path.into()))
}

#[cfg(not(unix))]
fn unix(_path: &str, original: &str) -> Result<Endpoint, TransportError> {
    Err(TransportError::InvalidEndpoint(original.to_string()))
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "tcp://{addr}"),
            #[cfg(unix)]
            Endpoint::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}
