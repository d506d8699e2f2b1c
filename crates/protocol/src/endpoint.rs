//! Derivation of the feed URL from a configured base address.

use crate::constants::WS_STATUS_PATH;

/// Errors from [`status_endpoint`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("empty base address")]
    Empty,

    #[error("unsupported scheme in base address: {0}")]
    UnsupportedScheme(String),
}

/// Derives the status feed URL from an API base address.
///
/// Trailing slashes are stripped, `http`/`https` are remapped to `ws`/`wss`,
/// and [`WS_STATUS_PATH`] is appended. Bases that already carry a `ws` or
/// `wss` scheme pass through unchanged. Any other scheme is rejected rather
/// than handed to the transport verbatim.
pub fn status_endpoint(base: &str) -> Result<String, EndpointError> {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return Err(EndpointError::Empty);
    }

    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_string()
    } else {
        let scheme = base.split(':').next().unwrap_or(base);
        return Err(EndpointError::UnsupportedScheme(scheme.to_string()));
    };

    Ok(format!("{ws_base}{WS_STATUS_PATH}"))
}
