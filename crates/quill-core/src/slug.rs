//! URL-safe identifiers derived from titles and names.

/// Slug of `text`, e.g. `"Web Development"` → `"web-development"`.
///
/// `_` and whitespace become separators, `@` reads as `at`, every other
/// non-alphanumeric character is dropped, and separator runs collapse.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;

    let expanded = text.replace('@', "-at-");
    for ch in expanded.chars() {
        if ch.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.extend(ch.to_lowercase());
        } else if ch == '-' || ch == '_' || ch.is_whitespace() {
            pending_separator = true;
        }
    }

    slug
}

/// `base`, `base-2`, `base-3`, … in order; the caller takes the first free one.
///
/// An empty base (a title made only of punctuation) falls back to `"post"`.
pub fn candidates(base: &str) -> impl Iterator<Item = String> + '_ {
    let base = if base.is_empty() { "post" } else { base };
    std::iter::once(base.to_string()).chain((2u32..).map(move |n| format!("{base}-{n}")))
}
