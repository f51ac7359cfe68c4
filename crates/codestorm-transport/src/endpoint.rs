//! Endpoint address derivation.
//!
//! The realtime endpoint lives on the same host as the web frontend. Its
//! scheme mirrors the page: `https` pages use `wss`, `http` pages use `ws`.

use crate::traits::TransportError;

/// Default realtime endpoint path.
pub const DEFAULT_PATH: &str = "/ws";

/// Derive the realtime endpoint URL from a page origin such as
/// `https://contest.lan:8443`.
///
/// Any path on the origin is discarded in favour of `path`.
///
/// # Errors
///
/// Returns an error if the origin has no host or an unsupported scheme.
pub fn endpoint_from_origin(origin: &str, path: &str) -> Result<String, TransportError> {
    let origin = origin.trim();
    let (scheme, rest) = if let Some(rest) = origin.strip_prefix("https://") {
        ("wss", rest)
    } else if let Some(rest) = origin.strip_prefix("http://") {
        ("ws", rest)
    } else if origin.starts_with("wss://") || origin.starts_with("ws://") {
        // Already a socket URL: keep the scheme, replace the path.
        let (scheme, rest) = origin.split_once("://").unwrap_or(("ws", origin));
        return join(scheme, rest, path, origin);
    } else {
        return Err(TransportError::InvalidEndpoint(format!(
            "unsupported origin scheme: {}",
            origin
        )));
    };

    join(scheme, rest, path, origin)
}

fn join(scheme: &str, rest: &str, path: &str, origin: &str) -> Result<String, TransportError> {
    let host = rest.split(|c: char| matches!(c, '/' | '?' | '#')).next().unwrap_or_default();
    if host.is_empty() {
        return Err(TransportError::InvalidEndpoint(format!(
            "origin has no host: {}",
            origin
        )));
    }

    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    Ok(format!("{}://{}{}", scheme, host, path))
}
