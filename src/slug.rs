//! URL slugs derived from display names

/// Generate a URL-friendly slug from a name.
///
/// ASCII letters are lowercased and digits kept. Every other ASCII character
/// becomes a hyphen, while non-ASCII characters such as `é` or `映` are
/// preserved. Runs of hyphens collapse to one and the ends are trimmed.
pub fn generate_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        let keep = c.is_ascii_alphanumeric() || !c.is_ascii();
        if keep {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c);
            pending_hyphen = false;
        } else {
            pending_hyphen = true;
        }
    }

    slug
}
