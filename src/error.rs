use std::path::PathBuf;

use crate::layout::WidgetId;

/// Errors raised while loading or validating a [`DashConfig`](crate::config::DashConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse error in {path}: {detail}")]
    Parse { path: PathBuf, detail: String },

    /// A tuning value is out of its allowed range.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("widget '{id}' appears more than once in the layout order")]
    DuplicateWidget { id: WidgetId },

    /// The primary readout must survive the highway override.
    #[error("primary widget '{id}' is not in the highway whitelist")]
    PrimaryNotWhitelisted { id: WidgetId },
}

/// Errors that can stop the simulation server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind the distribution channel. Fatal at startup.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
}

/// A reorder request that was refused. The layout is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("widgets can only be moved while customizing")]
    NotEditing,

    #[error("unknown widget '{id}'")]
    UnknownWidget { id: WidgetId },
}

/// Errors on the observer side of the connection.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        source: tungstenite::Error,
    },

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
}

/// A driver command line that could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}
