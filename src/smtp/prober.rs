use native_tls::TlsConnector;

use super::error::ProbeError;
use super::options::ProbeOptions;
use super::session::SmtpSession;
use super::stream::tls_connector;
use super::types::ValidationResult;

/// Anything able to ask `mx_host` whether it accepts `recipient`.
///
/// Implementations must not fail: transport problems are reported inside
/// the returned [`ValidationResult`].
pub trait Prober: Sync {
    fn probe(&self, mx_host: &str, recipient: &str) -> ValidationResult;
}

/// [`Prober`] that speaks SMTP over the network.
#[derive(Clone)]
pub struct SmtpProber {
    options: ProbeOptions,
    connector: TlsConnector,
}

impl SmtpProber {
    pub fn new(options: ProbeOptions) -> Result<Self, ProbeError> {
        let connector = tls_connector(&options)?;
        Ok(Self { options, connector })
    }

    pub fn options(&self) -> &ProbeOptions {
        &self.options
    }
}

impl Prober for SmtpProber {
    fn probe(&self, mx_host: &str, recipient: &str) -> ValidationResult {
        SmtpSession::new(mx_host, &self.options, &self.connector).probe(recipient)
    }
}
