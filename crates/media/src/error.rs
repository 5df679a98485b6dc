use std::error::Error as StdError;

use clawline_common::FromMessage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("{message}")]
    InvalidInput { message: String },
    #[error("no attachment at index {index}")]
    AttachmentNotFound { index: usize },
    #[error("attachment too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },
    #[error("fetch blocked for {url}: {reason}")]
    Blocked { url: String, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn external<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn blocked(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Blocked {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

clawline_common::impl_context!();
