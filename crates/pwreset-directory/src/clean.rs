//! Input sanitization for filter construction.
//!
//! User-supplied identifiers are embedded into structured search filters, so
//! they are scrubbed before substitution: whitespace and quote characters
//! are dropped and accented characters are folded to their ASCII
//! equivalents. Filter metacharacters are additionally escaped per RFC 4515
//! at substitution time. Both transforms are hard contracts of the
//! directory client, not cosmetics.

/// Folds a single accented character to its ASCII equivalent.
const fn fold_accent(ch: char) -> char {
    match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' => 'A',
        'Ç' => 'C',
        'È' | 'É' | 'Ê' | 'Ë' => 'E',
        'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
        'Ñ' => 'N',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
        'Ý' => 'Y',
        other => other,
    }
}

/// Scrubs a user-supplied string: accents folded, quotes and whitespace
/// removed.
#[must_use]
pub fn clean(input: &str) -> String {
    input
        .chars()
        .map(fold_accent)
        .filter(|ch| !ch.is_whitespace() && *ch != '\'' && *ch != '"')
        .collect()
}

/// Scrubs a user-supplied string and lowercases the result.
///
/// Used for account identifiers, which the directory matches
/// case-insensitively but which are normalized for display and comparison.
#[must_use]
pub fn clean_lower(input: &str) -> String {
    clean(input).to_lowercase()
}

/// Escapes a value for safe embedding into a search filter (RFC 4515).
#[must_use]
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
