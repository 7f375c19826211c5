//! Title to URL slug derivation.
//!
//! Derivation does not check uniqueness; the reconciler looks the slug up in
//! the target store before writing.

/// Derive a slug from `title`.
///
/// Lower-cases, collapses every run of characters outside `[a-z0-9]` into a
/// single `-`, and strips leading and trailing dashes.
///
/// ```
/// assert_eq!(core_sync::slug::derive("Future of AI"), "future-of-ai");
/// assert_eq!(core_sync::slug::derive("  C++ & Rust!! "), "c-rust");
/// ```
pub fn derive(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for ch in title.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// True when `slug` is already in derived form
pub fn is_valid(slug: &str) -> bool {
    !slug.is_empty() && derive(slug) == slug
}
