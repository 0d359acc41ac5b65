//! Run-level error type mapping failures onto exit statuses.

use std::io;

use thiserror::Error;
use transport::TransportError;

use crate::exit::ExitCode;

/// Errors that end a shell session.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The connection could not be established or died.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The line editor hit end of file on stdin (Ctrl-D or a closed
    /// controlling terminal).
    #[error("end of file on standard input")]
    EditorEof,

    /// The line editor failed outright.
    #[error("line editor: {0}")]
    Editor(String),

    /// The paired receive thread is gone.
    #[error("receive thread terminated")]
    PeerGone,

    /// Local terminal or file descriptor trouble.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ClientError {
    /// The exit status this failure maps to.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Transport(TransportError::Closed) => ExitCode::Ok,
            Self::Transport(TransportError::Protocol(_)) => ExitCode::Protocol,
            Self::Transport(
                TransportError::UnknownService { .. } | TransportError::Unreachable { .. },
            ) => ExitCode::Unavailable,
            Self::Transport(TransportError::Io(_)) | Self::Io(_) => ExitCode::IoError,
            Self::EditorEof | Self::Editor(_) | Self::PeerGone => ExitCode::Software,
        }
    }
}
