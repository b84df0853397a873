use std::io;

use thiserror::Error;

use super::session::Stage;
use super::types::{DiagnosticTag, RecipientStatus};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{stage} timed out")]
    Timeout { stage: Stage },
    #[error("connection to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("no socket address for {host}")]
    NoAddress { host: String },
    #[error("I/O error during {stage}: {source}")]
    Io {
        stage: Stage,
        #[source]
        source: io::Error,
    },
    #[error("TLS handshake failed: {source}")]
    Tls {
        #[source]
        source: native_tls::Error,
    },
    #[error("TLS handshake did not complete before the timeout")]
    TlsStalled,
    #[error("TLS connector initialization failed: {source}")]
    TlsInit {
        #[source]
        source: native_tls::Error,
    },
    #[error("{stage} rejected: {reply}")]
    Rejected {
        stage: Stage,
        code: Option<u16>,
        reply: String,
    },
    #[error("refusing to send command containing a line break: {0:?}")]
    InvalidCommand(String),
}

impl ProbeError {
    /// Classifies an I/O failure raised at `stage`, folding timeouts into
    /// [`ProbeError::Timeout`].
    pub(crate) fn io(stage: Stage, source: io::Error) -> Self {
        if is_timeout(&source) {
            Self::Timeout { stage }
        } else {
            Self::Io { stage, source }
        }
    }

    pub(crate) fn connect(host: &str, source: io::Error) -> Self {
        if is_timeout(&source) {
            Self::Timeout {
                stage: Stage::Connect,
            }
        } else {
            Self::Connect {
                host: host.to_string(),
                source,
            }
        }
    }

    pub fn tag(&self) -> DiagnosticTag {
        match self {
            Self::Timeout { .. } => DiagnosticTag::Timeout,
            Self::Tls { .. } | Self::TlsStalled | Self::TlsInit { .. } => {
                DiagnosticTag::TlsHandshakeFailed
            }
            Self::Connect { .. }
            | Self::NoAddress { .. }
            | Self::Io { .. }
            | Self::InvalidCommand(_) => DiagnosticTag::Exception,
            Self::Rejected { .. } => DiagnosticTag::Unclassified,
        }
    }

    /// Connection-level and TLS failures are worth retrying later; anything
    /// that breaks an established session is not, unless the server itself
    /// answered with a transient code.
    pub fn status(&self) -> RecipientStatus {
        match self {
            Self::Timeout { .. }
            | Self::Connect { .. }
            | Self::NoAddress { .. }
            | Self::Tls { .. }
            | Self::TlsStalled
            | Self::TlsInit { .. } => RecipientStatus::TemporaryFailure,
            Self::Rejected { code, .. } => match code {
                Some(code) if (400..500).contains(code) => RecipientStatus::TemporaryFailure,
                _ => RecipientStatus::UnknownFailure,
            },
            Self::Io { .. } | Self::InvalidCommand(_) => RecipientStatus::UnknownFailure,
        }
    }
}

fn is_timeout(err: &io::Error) -> bool {
    // read timeouts surface as WouldBlock on unix and TimedOut on windows
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}
