use std::fmt;

use chrono::{DateTime, Utc};

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use super::classify::classify;
use super::error::ProbeError;
use super::reply::SmtpReply;

/// Coarse outcome of a recipient probe.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipientStatus {
    Valid,
    UserNotFound,
    TemporaryFailure,
    UnknownFailure,
    Blacklisted,
}

impl RecipientStatus {
    /// Status implied by the reply class alone, used by rules that only
    /// look at the wording.
    pub fn from_code_class(code: u16) -> Self {
        match code / 100 {
            2 => Self::Valid,
            4 => Self::TemporaryFailure,
            _ => Self::UnknownFailure,
        }
    }
}

impl fmt::Display for RecipientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Valid => "Valid",
            Self::UserNotFound => "UserNotFound",
            Self::TemporaryFailure => "TemporaryFailure",
            Self::UnknownFailure => "UnknownFailure",
            Self::Blacklisted => "Blacklisted",
        })
    }
}

/// Fine-grained label for a probe outcome. Reply-derived tags come from
/// [`classify`]; `Timeout`, `Exception` and `TlsHandshakeFailed` only ever
/// come from the transport.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticTag {
    Accepted,
    Forwarded,
    CannotVerify,
    ServiceUnavailable,
    MailboxBusy,
    LocalError,
    InsufficientStorage,
    MailboxNotFound,
    UserNotLocal,
    StorageExceeded,
    MailboxNameInvalid,
    TransactionFailed,
    RelayDenied,
    AccessDenied,
    Greylisted,
    SyntaxError,
    BlockedByBlacklist,
    #[cfg_attr(feature = "with-serde", serde(rename = "TLSHandshakeFailed"))]
    TlsHandshakeFailed,
    Timeout,
    Exception,
    Unclassified,
}

impl DiagnosticTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "Accepted",
            Self::Forwarded => "Forwarded",
            Self::CannotVerify => "CannotVerify",
            Self::ServiceUnavailable => "ServiceUnavailable",
            Self::MailboxBusy => "MailboxBusy",
            Self::LocalError => "LocalError",
            Self::InsufficientStorage => "InsufficientStorage",
            Self::MailboxNotFound => "MailboxNotFound",
            Self::UserNotLocal => "UserNotLocal",
            Self::StorageExceeded => "StorageExceeded",
            Self::MailboxNameInvalid => "MailboxNameInvalid",
            Self::TransactionFailed => "TransactionFailed",
            Self::RelayDenied => "RelayDenied",
            Self::AccessDenied => "AccessDenied",
            Self::Greylisted => "Greylisted",
            Self::SyntaxError => "SyntaxError",
            Self::BlockedByBlacklist => "BlockedByBlacklist",
            Self::TlsHandshakeFailed => "TLSHandshakeFailed",
            Self::Timeout => "Timeout",
            Self::Exception => "Exception",
            Self::Unclassified => "Unclassified",
        }
    }
}

impl fmt::Display for DiagnosticTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one probe against one mail exchanger.
///
/// Built once when the session ends and never modified afterwards; all
/// fields are read through accessors.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    status: RecipientStatus,
    smtp_code: i32,
    diagnostic_tag: DiagnosticTag,
    transcript: String,
    mx_host: String,
    timestamp: DateTime<Utc>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    error_message: Option<String>,
}

impl ValidationResult {
    /// Result for a session that reached a decisive reply. `code` is `None`
    /// when the reply had no parsable status code.
    pub fn from_reply(
        mx_host: impl Into<String>,
        code: Option<u16>,
        reply_text: &str,
        transcript: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let (status, diagnostic_tag) = classify(code, reply_text);
        Self {
            status,
            smtp_code: code.map(i32::from).unwrap_or(-1),
            diagnostic_tag,
            transcript: transcript.into(),
            mx_host: mx_host.into(),
            timestamp,
            error_message: None,
        }
    }

    pub(crate) fn from_smtp_reply(
        mx_host: &str,
        reply: &SmtpReply,
        transcript: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::from_reply(mx_host, reply.code, &reply.text(), transcript, timestamp)
    }

    /// Result for a session cut short by a transport or protocol failure.
    pub fn from_failure(
        mx_host: impl Into<String>,
        error: &ProbeError,
        transcript: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            status: error.status(),
            smtp_code: -1,
            diagnostic_tag: error.tag(),
            transcript: transcript.into(),
            mx_host: mx_host.into(),
            timestamp,
            error_message: Some(error.to_string()),
        }
    }

    pub fn status(&self) -> RecipientStatus {
        self.status
    }

    /// Reply code of the decisive `RCPT TO`, or `-1`.
    pub fn smtp_code(&self) -> i32 {
        self.smtp_code
    }

    pub fn diagnostic_tag(&self) -> DiagnosticTag {
        self.diagnostic_tag
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn mx_host(&self) -> &str {
        &self.mx_host
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// ISO-8601 rendering of [`timestamp`](Self::timestamp).
    pub fn timestamp_iso(&self) -> String {
        self.timestamp
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// True when the session ended without a decisive reply.
    pub fn is_transport_failure(&self) -> bool {
        self.error_message.is_some()
    }
}
