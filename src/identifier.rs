//! Relation names and SQL quoting derived from user-supplied file names.

/// Relation name used when a file name sanitizes to nothing (e.g. `".csv"`).
pub const DEFAULT_RELATION_NAME: &str = "data";

/// Prefix for names that would otherwise start with a digit.
pub const DIGIT_PREFIX: &str = "t_";

/// Derive a relation name from a file name.
///
/// Takes the last path component (`/` or `\` separated), drops the final
/// extension, and replaces anything outside `[A-Za-z0-9_]` with `_`. The result
/// always matches `^[A-Za-z_][A-Za-z0-9_]*$`.
pub fn derive_relation_name(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let stem = match base.rfind('.') {
        Some(idx) => &base[..idx],
        None => base,
    };
    let mut name: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() {
        return DEFAULT_RELATION_NAME.to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert_str(0, DIGIT_PREFIX);
    }
    name
}

/// True when `name` can be used in SQL without quoting.
pub fn is_safe_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quote `name` as a SQL identifier unless it is already safe.
pub fn format_identifier_for_sql(name: &str) -> String {
    if is_safe_identifier(name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Single-quote `text` as a SQL string literal, doubling embedded quotes.
pub fn escape_sql_string(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
