//! Address shape checks.
//!
//! Accepts what mail providers hand out in practice and rejects anything
//! that cannot be probed over SMTP without quoting. Nothing here touches the
//! network.

mod domain;
mod local;
mod types;

pub use types::{AddressError, EmailAddress};

use domain::is_domain_pragmatic;
use local::is_local_pragmatic;

/// Parses `raw` into an [`EmailAddress`].
pub fn parse_address(raw: &str) -> Result<EmailAddress, AddressError> {
    let mut parts = raw.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AddressError::MissingAt);
    };

    if local.is_empty() {
        return Err(AddressError::EmptyLocalPart);
    }
    if domain.is_empty() {
        return Err(AddressError::EmptyDomain);
    }
    if !is_local_pragmatic(local) {
        return Err(AddressError::InvalidLocalPart(local.to_string()));
    }
    if !is_domain_pragmatic(domain) {
        return Err(AddressError::InvalidDomain(domain.to_string()));
    }

    Ok(EmailAddress::new(raw, local, domain))
}

pub fn is_valid_shape(raw: &str) -> bool {
    parse_address(raw).is_ok()
}

/// Returns the lower-cased text after the first `@`, or `None` when the `@`
/// is missing, leading or trailing.
pub fn extract_domain(raw: &str) -> Option<String> {
    let at = raw.find('@')?;
    if at == 0 || at == raw.len() - 1 {
        return None;
    }
    Some(raw[at + 1..].to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_basic() {
        let addr = parse_address("Alice.Smith@Example.COM").unwrap();
        assert_eq!(addr.local_part(), "Alice.Smith");
        assert_eq!(addr.domain(), "example.com");
        assert_eq!(addr.original(), "Alice.Smith@Example.COM");
    }

    #[test]
    fn rejects_double_at() {
        assert_eq!(parse_address("a@@b.com"), Err(AddressError::MissingAt));
        assert_eq!(parse_address("a@b@c.com"), Err(AddressError::MissingAt));
    }

    #[test]
    fn rejects_missing_halves() {
        assert_eq!(parse_address("plainaddress"), Err(AddressError::MissingAt));
        assert_eq!(parse_address("@example.com"), Err(AddressError::EmptyLocalPart));
        assert_eq!(parse_address("user@"), Err(AddressError::EmptyDomain));
    }

    #[test]
    fn rejects_dotless_domain() {
        assert!(matches!(
            parse_address("a@b"),
            Err(AddressError::InvalidDomain(_))
        ));
    }

    #[test]
    fn extract_domain_edges() {
        assert_eq!(extract_domain("user@Example.com").as_deref(), Some("example.com"));
        assert_eq!(extract_domain("@example.com"), None);
        assert_eq!(extract_domain("user@"), None);
        assert_eq!(extract_domain("user"), None);
    }

    #[test]
    fn shape_helper_matches_parser() {
        assert!(is_valid_shape("x+tag@sub.domain.org"));
        assert!(!is_valid_shape("x y@domain.org"));
    }
}
