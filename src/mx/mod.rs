//! Mail-exchanger resolution.
//!
//! [`MxResolver`] asks DNS for MX records, falls back to A records when none
//! exist, and returns candidates in probing order.

mod error;
mod resolver;
mod types;

pub use error::MxError as Error;
pub use resolver::{DnsLookup, MxResolver, SystemResolver, parse_mx_record, resolve_with};

#[cfg(test)]
pub(crate) use resolver::Pool;
pub use types::MxCandidate;

#[cfg(test)]
pub(crate) mod tests;
