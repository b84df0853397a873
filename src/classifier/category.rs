use std::fmt;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use crate::smtp::{DiagnosticTag, RecipientStatus, ValidationResult};

/// Final verdict for an address.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Valid,
    Invalid,
    Disposable,
    Unknown,
    #[cfg_attr(feature = "with-serde", serde(rename = "Catch-All"))]
    CatchAll,
    Forwarded,
    CannotVerify,
    MailboxBusy,
    LocalError,
    InsufficientStorage,
    UserNotFound,
    RelayDenied,
    AccessDenied,
    Greylisted,
    SyntaxError,
    Blocklisted,
}

impl Category {
    /// Maps a probe outcome to a category, keyed on the diagnostic tag and
    /// falling back on the status for tags without a category of their own.
    pub fn from_result(result: &ValidationResult) -> Self {
        Self::from_tag(result.diagnostic_tag(), result.status())
    }

    pub fn from_tag(tag: DiagnosticTag, status: RecipientStatus) -> Self {
        match tag {
            DiagnosticTag::Accepted => Self::Valid,
            DiagnosticTag::Forwarded => Self::Forwarded,
            DiagnosticTag::CannotVerify => Self::CannotVerify,
            DiagnosticTag::MailboxBusy => Self::MailboxBusy,
            DiagnosticTag::LocalError => Self::LocalError,
            DiagnosticTag::InsufficientStorage => Self::InsufficientStorage,
            DiagnosticTag::MailboxNotFound
            | DiagnosticTag::UserNotLocal
            | DiagnosticTag::MailboxNameInvalid => Self::UserNotFound,
            DiagnosticTag::RelayDenied => Self::RelayDenied,
            DiagnosticTag::AccessDenied => Self::AccessDenied,
            DiagnosticTag::Greylisted => Self::Greylisted,
            DiagnosticTag::SyntaxError => Self::SyntaxError,
            DiagnosticTag::TransactionFailed => Self::Invalid,
            DiagnosticTag::BlockedByBlacklist => Self::Blocklisted,
            DiagnosticTag::ServiceUnavailable
            | DiagnosticTag::StorageExceeded
            | DiagnosticTag::TlsHandshakeFailed
            | DiagnosticTag::Timeout
            | DiagnosticTag::Exception
            | DiagnosticTag::Unclassified => match status {
                RecipientStatus::TemporaryFailure => Self::Unknown,
                _ => Self::Invalid,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "Valid",
            Self::Invalid => "Invalid",
            Self::Disposable => "Disposable",
            Self::Unknown => "Unknown",
            Self::CatchAll => "Catch-All",
            Self::Forwarded => "Forwarded",
            Self::CannotVerify => "CannotVerify",
            Self::MailboxBusy => "MailboxBusy",
            Self::LocalError => "LocalError",
            Self::InsufficientStorage => "InsufficientStorage",
            Self::UserNotFound => "UserNotFound",
            Self::RelayDenied => "RelayDenied",
            Self::AccessDenied => "AccessDenied",
            Self::Greylisted => "Greylisted",
            Self::SyntaxError => "SyntaxError",
            Self::Blocklisted => "Blocklisted",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
