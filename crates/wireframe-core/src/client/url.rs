//! URL parser for the client configuration surface: accepts
//! `scheme://host[:port]/path` for `http`, `https`, `ws`, and `wss`, with
//! default ports 80/443.

use crate::error::{codes, WireError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
    Ws,
    Wss,
}

impl Scheme {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            "ws" => Scheme::Ws,
            "wss" => Scheme::Wss,
            _ => return None,
        })
    }

    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http | Scheme::Ws => 80,
            Scheme::Https | Scheme::Wss => 443,
        }
    }

    pub fn is_tls(self) -> bool {
        matches!(self, Scheme::Https | Scheme::Wss)
    }
}

#[derive(Debug, Clone)]
pub struct Url {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    pub path: String,
}

/// Parse `scheme://host[:port]/path`. A missing path defaults to `/`.
pub fn parse(input: &str) -> Result<Url, WireError> {
    let (scheme_str, rest) = input
        .split_once("://")
        .ok_or_else(|| bad_url("missing scheme separator \"://\""))?;
    let scheme = Scheme::parse(scheme_str).ok_or_else(|| bad_url("unsupported scheme"))?;

    let (authority, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, "/"),
    };
    if authority.is_empty() {
        return Err(bad_url("missing host"));
    }

    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port_str)) => {
            let port: u16 = port_str.parse().map_err(|_| bad_url("invalid port"))?;
            (host.to_string(), port)
        }
        None => (authority.to_string(), scheme.default_port()),
    };

    Ok(Url {
        scheme,
        host,
        port,
        path: path.to_string(),
    })
}

fn bad_url(msg: &'static str) -> WireError {
    WireError::new(codes::BAD_REQUEST, msg)
}
