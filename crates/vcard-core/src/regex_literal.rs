//! `/pattern/flags` literal handling
//!
//! Patterns are stored with `\/` unescaped. Export re-escapes them, and
//! because escaping always starts from the unescaped form, repeated
//! export/import cycles never accumulate backslashes.

/// Replace `\/` with `/`, leaving every other escape pair untouched
pub fn unescape_slashes(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('/') => out.push('/'),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }

    out
}

/// Escape bare `/` as `\/`, leaving existing escape pairs untouched
pub fn escape_slashes(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push('\\');
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '/' => out.push_str("\\/"),
            _ => out.push(c),
        }
    }

    out
}

/// Split a `/pattern/flags` literal into `(unescaped pattern, flags)`
///
/// Returns `None` for anything that is not a well-formed literal: no leading
/// slash, an empty body, an escaped closing delimiter or non-letter flags.
pub fn parse_regex_literal(text: &str) -> Option<(String, String)> {
    let text = text.trim();
    if !text.starts_with('/') {
        return None;
    }

    let last = text.rfind('/')?;
    if last == 0 {
        return None;
    }

    let body = &text[1..last];
    let flags = &text[last + 1..];
    if body.is_empty() || !flags.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let trailing_backslashes = body.chars().rev().take_while(|c| *c == '\\').count();
    if trailing_backslashes % 2 == 1 {
        return None;
    }

    Some((unescape_slashes(body), flags.to_string()))
}

/// Canonical `/pattern/flags` literal
pub fn to_regex_literal(pattern: &str, flags: &str) -> String {
    format!("/{}/{}", escape_slashes(&unescape_slashes(pattern)), flags)
}
