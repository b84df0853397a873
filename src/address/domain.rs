/// Domain shape check: letters, digits, `.` and `-`, at least one dot, and a
/// final label made of two or more ASCII letters.
pub(crate) fn is_domain_pragmatic(domain: &str) -> bool {
    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return false;
    }
    let Some((head, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !head.is_empty() && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}
