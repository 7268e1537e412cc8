//! Naming rule for collections and fields.
//!
//! A valid name is a non-empty string made only of ASCII letters, digits and
//! underscores. Names are interpolated into SQL as identifiers, so nothing
//! else is ever allowed through.

/// Returns `true` if `name` satisfies the naming rule.
///
/// # Examples
///
/// ```rust
/// use tensordb::naming::is_valid_name;
///
/// assert!(is_valid_name("field_1"));
/// assert!(!is_valid_name("drop table"));
/// assert!(!is_valid_name(""));
/// ```
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Quotes an already validated identifier for interpolation into SQL.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name)
}
