//! Error types for the CLI

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Taikun(#[from] taikun_common::Error),

    #[error("command failed: {message}")]
    CommandFailed { message: String },
}

impl Error {
    pub fn command_failed(message: impl Into<String>) -> Self {
        Error::CommandFailed {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_errors_keep_their_message() {
        let err: Error = taikun_common::Error::transport_status("delete project", 409, "locked").into();
        assert_eq!(
            err.to_string(),
            "transport error [delete project] (HTTP 409): locked"
        );
    }

    #[test]
    fn command_failed_message() {
        assert_eq!(
            Error::command_failed("boom").to_string(),
            "command failed: boom"
        );
    }
}
