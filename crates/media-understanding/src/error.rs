use clawline_common::FromMessage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown media capability: {name}")]
    UnknownCapability { name: String },

    #[error(transparent)]
    Media(#[from] clawline_media::Error),

    #[error("provider {provider} failed: {message}")]
    Provider { provider: String, message: String },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
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
