use std::time::Duration;

/// Errors raised while talking to the RCON endpoint.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("rcon connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("rcon authentication rejected by {addr}")]
    AuthRejected { addr: String },

    #[error("rcon {operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("rcon command is {len} bytes, limit is {max}")]
    CommandTooLong { len: usize, max: usize },

    #[error("rcon protocol error: {message}")]
    Protocol { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("rcon reconnect failed: {source}")]
    Reconnect {
        #[source]
        source: Box<Error>,
    },

    #[error("rcon execute after reconnect: {source}")]
    RetryFailed {
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn reconnect(source: Error) -> Self {
        Self::Reconnect {
            source: Box::new(source),
        }
    }

    /// Whether the error leaves the connection in an unknown state.
    ///
    /// Oversized commands are rejected before anything is written, so the
    /// connection stays usable.
    pub fn is_connection_fault(&self) -> bool {
        !matches!(self, Self::CommandTooLong { .. })
    }

    #[must_use]
    pub fn retry_failed(source: Error) -> Self {
        Self::RetryFailed {
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
