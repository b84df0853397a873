/// Pragmatic local-part rule: ASCII letters, digits and `._%+-` only.
/// Quoted strings and the rest of RFC 5322 atext are rejected.
pub(crate) fn is_local_pragmatic(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '%' | '+' | '-'))
}
