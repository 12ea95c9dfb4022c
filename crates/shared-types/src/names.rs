//! # Name Legality
//!
//! Hierarchical names (namespaces, parameter names, interface addresses) and
//! base names (tags) follow the graph naming rules of the execution
//! environment:
//!
//! | Kind | First character | Remaining characters |
//! |------|-----------------|----------------------|
//! | name | `~`, `/` or letter | letters, digits, `_`, `/` (no `//`) |
//! | base name | letter | letters, digits, `_` |
//!
//! The empty string is a legal name (it denotes the root namespace) but never
//! a legal base name.

use crate::errors::NameError;

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Check whether `name` is a legal hierarchical name.
pub fn is_legal_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return true;
    };

    if !(first == '~' || first == '/' || first.is_ascii_alphabetic()) {
        return false;
    }

    chars.all(|c| is_word_char(c) || c == '/') && !name.contains("//")
}

/// Check whether `name` is a legal base name.
pub fn is_legal_base_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => chars.all(is_word_char),
        _ => false,
    }
}

/// Validate a hierarchical name.
pub fn validate_name(name: &str) -> Result<(), NameError> {
    if is_legal_name(name) {
        Ok(())
    } else {
        Err(NameError::IllegalName(name.to_string()))
    }
}

/// Validate a tag (container tag, robot ID, interface tag).
pub fn validate_tag(tag: &str) -> Result<(), NameError> {
    if is_legal_base_name(tag) {
        Ok(())
    } else {
        Err(NameError::IllegalTag(tag.to_string()))
    }
}

/// Validate node launch arguments.
///
/// Only the substitutions `$(find PKG)` and `$(env VAR)` may use `$`; a `;`
/// is never allowed.
pub fn validate_launch_args(args: &str) -> Result<(), NameError> {
    let illegal = || NameError::IllegalArguments(args.to_string());

    if args.contains(';') {
        return Err(illegal());
    }

    let mut rest = args;
    while let Some(pos) = rest.find('$') {
        let tail = &rest[pos + 1..];
        let body = tail
            .strip_prefix("(find ")
            .or_else(|| tail.strip_prefix("(env "))
            .ok_or_else(illegal)?;
        let end = body.find(')').ok_or_else(illegal)?;
        let arg = &body[..end];
        if arg.is_empty() || !arg.chars().all(is_word_char) {
            return Err(illegal());
        }
        rest = &body[end + 1..];
    }

    Ok(())
}
