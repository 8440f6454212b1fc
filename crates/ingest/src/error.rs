use std::error::Error as StdError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No running instance matched the selector.
    #[error("no instance matches selector {selector}")]
    NotFound { selector: String },

    /// The log source API answered with a non-success status.
    #[error("{operation} failed with status {status}: {body}")]
    Api {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The log stream broke mid-read.
    #[error("log stream failed: {source}")]
    Stream {
        #[source]
        source: std::io::Error,
    },

    /// A hook registration step failed. Steps are numbered from 1.
    #[error("registration failed at step {step}: {reason}")]
    Registration { step: usize, reason: String },

    #[error("invalid poll response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Command(#[from] gamebridge_rcon::Error),

    #[error("invalid line pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("{0}")]
    Message(String),
}

impl Error {
    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

impl gamebridge_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

gamebridge_common::impl_context!();
