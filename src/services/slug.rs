//! URL slugs for categories

/// Convert a category name into its URL slug.
///
/// Characters other than ASCII letters, digits, whitespace, `_` and `-` are
/// removed. Runs of whitespace and hyphens become a single `-`, and leading
/// or trailing `-`/`_` are stripped.
pub fn slugify(value: &str) -> String {
    let kept: String = value
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '_' || *c == '-')
        .collect();

    let mut slug = String::with_capacity(kept.len());
    let mut in_separator = false;
    for c in kept.chars() {
        if c == '-' || c.is_whitespace() {
            in_separator = true;
            continue;
        }
        if in_separator {
            slug.push('-');
            in_separator = false;
        }
        slug.push(c);
    }
    // Trailing separators are never flushed.
    slug.trim_matches(|c| c == '-' || c == '_').to_string()
}
