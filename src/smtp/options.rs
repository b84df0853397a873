use std::borrow::Cow;
use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Identity and limits used by every probe.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Name sent with `EHLO`; defaults to the probed host.
    pub helo_name: Option<String>,
    /// Envelope sender for `MAIL FROM`; defaults to `validator@<host>`.
    pub mail_from: Option<String>,
    pub port: u16,
    /// Connect bound, also applied to every read and write.
    pub timeout_ms: u64,
    /// Upgrade with STARTTLS when the server advertises it.
    pub starttls: bool,
    /// Opportunistic TLS: skip certificate and hostname verification.
    pub accept_invalid_certs: bool,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            helo_name: None,
            mail_from: None,
            port: 25,
            timeout_ms: 5_000,
            starttls: true,
            accept_invalid_certs: true,
        }
    }
}

impl ProbeOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }

    pub fn helo_name<'a>(&'a self, mx_host: &'a str) -> Cow<'a, str> {
        self.helo_name
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .map(Cow::Borrowed)
            .unwrap_or(Cow::Borrowed(mx_host))
    }

    pub fn mail_from(&self, mx_host: &str) -> String {
        self.mail_from
            .as_ref()
            .filter(|value| !value.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("validator@{mx_host}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_falls_back_to_host() {
        let options = ProbeOptions::default();
        assert_eq!(options.helo_name("mx1.example.com"), "mx1.example.com");
        assert_eq!(options.mail_from("mx1.example.com"), "validator@mx1.example.com");
    }

    #[test]
    fn configured_identity_wins() {
        let options = ProbeOptions {
            helo_name: Some("probe.example.org".into()),
            mail_from: Some("bounce@example.org".into()),
            ..ProbeOptions::default()
        };
        assert_eq!(options.helo_name("mx"), "probe.example.org");
        assert_eq!(options.mail_from("mx"), "bounce@example.org");
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let options = ProbeOptions {
            timeout_ms: 0,
            ..ProbeOptions::default()
        };
        assert_eq!(options.timeout(), Duration::from_millis(1));
    }
}
