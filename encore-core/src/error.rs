use thiserror::Error;

/// All errors produced by encore-core.
#[derive(Debug, Error)]
pub enum EncoreError {
    #[error("media server unreachable: {0}")]
    Transport(String),

    #[error("media server returned status {status} for {path}")]
    Status { status: u16, path: String },

    #[error("malformed media server response: {0}")]
    Parse(String),

    #[error("announcement failed: {0}")]
    Announce(String),

    #[error("engine is already running")]
    AlreadyRunning,

    #[error("engine is not running")]
    NotRunning,

    #[error("dispatch queue is closed")]
    QueueClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EncoreError {
    /// Whether a retry with backoff may succeed (network hiccups, 5xx).
    pub fn is_transient(&self) -> bool {
        match self {
            EncoreError::Transport(_) => true,
            EncoreError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, EncoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_and_server_errors_are_transient() {
        assert!(EncoreError::Transport("connection refused".into()).is_transient());
        assert!(EncoreError::Status {
            status: 503,
            path: "Playback/Info".into()
        }
        .is_transient());
        assert!(!EncoreError::Status {
            status: 401,
            path: "Playback/Info".into()
        }
        .is_transient());
        assert!(!EncoreError::Parse("unexpected eof".into()).is_transient());
    }
}
