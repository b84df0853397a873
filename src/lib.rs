#![forbid(unsafe_code)]
//! mailprobe: SMTP deliverability probing (syntax, MX, STARTTLS, RCPT TO,
//! catch-all) without sending mail.

pub mod address;
pub use address::{AddressError, EmailAddress, extract_domain, is_valid_shape, parse_address};

pub mod mx;
pub use mx::{DnsLookup, Error as MxError, MxCandidate, MxResolver, SystemResolver};

pub mod smtp;
pub use smtp::{
    DiagnosticTag, ProbeError, ProbeOptions, Prober, RecipientStatus, SmtpProber, ValidationResult,
};

pub mod catchall;
pub use catchall::CatchAllError;

pub mod classifier;
pub use classifier::{
    BlacklistPolicy, CategorizedEmail, Category, ClassifierError, ClassifierOptions, DomainList,
    DomainLists, DomainSet, EmailClassifier,
};
