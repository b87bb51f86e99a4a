//! `Cache-Control` parsing.
//!
//! Grammar:
//! ```text
//! Cache-Control   = directive *( OWS "," OWS directive )
//! directive       = token [ "=" ( token / quoted-string ) ]
//! ```
//! Anything the grammar does not consume makes the whole header invalid.
//! Directive names are kept as sent; values are lowercased.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheControl {
    directives: BTreeMap<String, Option<String>>,
    max_age: Option<i64>,
}

impl CacheControl {
    /// Parse a header value. `None` when it does not follow the grammar, or
    /// when `max-age` is present but not numeric.
    pub fn parse(field: &str) -> Option<Self> {
        let mut directives = BTreeMap::new();
        let mut rest = field;
        let mut first = true;

        while !rest.is_empty() {
            if !first {
                rest = rest.trim_start_matches(is_ows);
                rest = rest.strip_prefix(',')?;
                rest = rest.trim_start_matches(is_ows);
            }
            first = false;

            let (name, after) = take_token(rest)?;
            rest = after;

            let mut value = None;
            if let Some(after_eq) = rest.strip_prefix('=') {
                if let Some((token, after)) = take_token(after_eq) {
                    value = Some(token.to_lowercase());
                    rest = after;
                } else if let Some((quoted, after)) = take_quoted(after_eq) {
                    // An empty quoted value counts as a bare flag.
                    value = (!quoted.is_empty()).then(|| quoted.to_lowercase());
                    rest = after;
                }
            }
            directives.insert(name.to_string(), value);
        }

        let max_age = match directives.get("max-age") {
            None => None,
            Some(None) => return None,
            Some(Some(raw)) => Some(leading_int(raw)?),
        };

        Some(Self { directives, max_age })
    }

    /// `max-age` in seconds, as sent (may be zero or negative).
    pub fn max_age(&self) -> Option<i64> {
        self.max_age
    }

    /// True when `name` is present, with or without a value.
    pub fn has(&self, name: &str) -> bool {
        self.directives.contains_key(name)
    }

    /// Value of `name`; `None` for absent or bare directives.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.directives.get(name).and_then(|v| v.as_deref())
    }
}

fn is_ows(c: char) -> bool {
    c.is_whitespace()
}

fn is_token_char(c: char) -> bool {
    !(c <= '\u{20}'
        || c == '\u{7f}'
        || matches!(
            c,
            '(' | ')' | '<' | '>' | '@' | ',' | ';' | ':' | '\\' | '"' | '/' | '[' | ']' | '?' | '=' | '{' | '}'
        ))
}

fn take_token(input: &str) -> Option<(&str, &str)> {
    let end = input.find(|c: char| !is_token_char(c)).unwrap_or(input.len());
    if end == 0 {
        return None;
    }
    Some(input.split_at(end))
}

/// Quoted string with backslash escapes; returns the raw inner text.
fn take_quoted(input: &str) -> Option<(&str, &str)> {
    let body = input.strip_prefix('"')?;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some((&body[..i], &body[i + 1..])),
            _ => {}
        }
    }
    None
}

/// Leading optionally-signed decimal digits; `None` if there are none.
fn leading_int(raw: &str) -> Option<i64> {
    let (sign, digits) = match raw.as_bytes().first() {
        Some(b'-') => (-1, &raw[1..]),
        Some(b'+') => (1, &raw[1..]),
        _ => (1, raw),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}
