//! Identifier normalization helpers.
//!
//! Every name that reaches a SQL fragment passes through these; raw caller
//! input is never interpolated into identifiers.

/// Normalize a raw name to lowercase snake_case, keeping only
/// `[a-z0-9_]`. `None` when nothing valid remains or the result does not
/// start with a letter or underscore.
pub fn sanitize_identifier(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());

    for c in raw.trim().chars() {
        match c {
            'a'..='z' | '0'..='9' | '_' => out.push(c),
            'A'..='Z' => out.push(c.to_ascii_lowercase()),
            ' ' | '-' | '.' => out.push('_'),
            _ => {}
        }
    }

    let starts_ok = out
        .chars()
        .next()
        .map(|c| c.is_ascii_lowercase() || c == '_')
        .unwrap_or(false);

    if starts_ok {
        Some(out)
    } else {
        None
    }
}

/// Naive English singular, good enough for `vendors` -> `vendor` style
/// table-to-column guesses.
pub fn singularize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    if let Some(stem) = name.strip_suffix("ses") {
        return format!("{}s", stem);
    }
    if name.ends_with("ss") {
        return name.to_string();
    }
    if let Some(stem) = name.strip_suffix('s') {
        return stem.to_string();
    }

    name.to_string()
}

/// Inverse guess used when only a `*_id` column name is available.
pub fn pluralize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix('y') {
        return format!("{}ies", stem);
    }
    if name.ends_with('s') {
        return format!("{}es", name);
    }

    format!("{}s", name)
}
