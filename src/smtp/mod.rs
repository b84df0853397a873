//! SMTP recipient probing.
//!
//! [`SmtpSession`] drives banner, `EHLO`, optional `STARTTLS`, `MAIL FROM`
//! and `RCPT TO` over a raw socket, and [`classify`] turns the final reply
//! into a [`RecipientStatus`] and a [`DiagnosticTag`].

mod classify;
mod error;
mod options;
mod prober;
mod reply;
mod session;
mod stream;
mod types;

pub use classify::classify;
pub use error::ProbeError;
pub use options::ProbeOptions;
pub use prober::{Prober, SmtpProber};
pub use reply::{ReplyReader, SmtpReply};
pub use session::{SmtpSession, Stage};
pub use stream::tls_connector;
pub use types::{DiagnosticTag, RecipientStatus, ValidationResult};
