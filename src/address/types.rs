use std::fmt;

use thiserror::Error;

/// A syntactically plausible address, split into its two halves.
///
/// `domain` is always lower-cased; `local_part` keeps the caller's casing
/// because some servers treat it case-sensitively.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    original: String,
    local_part: String,
    domain: String,
}

impl EmailAddress {
    pub(crate) fn new(original: &str, local_part: &str, domain: &str) -> Self {
        Self {
            original: original.to_string(),
            local_part: local_part.to_string(),
            domain: domain.to_ascii_lowercase(),
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn local_part(&self) -> &str {
        &self.local_part
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.local_part, self.domain)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("must contain exactly one '@'")]
    MissingAt,
    #[error("local part is empty")]
    EmptyLocalPart,
    #[error("domain is empty")]
    EmptyDomain,
    #[error("invalid local part '{0}'")]
    InvalidLocalPart(String),
    #[error("invalid domain '{0}'")]
    InvalidDomain(String),
}
