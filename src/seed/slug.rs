//! Slug normalisation and per-run uniqueness

use std::collections::HashSet;

/// Normalise to lowercase `[a-z0-9-]` with single separators
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }
    slug
}

/// Issues unique slugs for one kind of document
#[derive(Debug, Clone)]
pub struct SlugRegistry {
    prefix: &'static str,
    used: HashSet<String>,
}

impl SlugRegistry {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            used: HashSet::new(),
        }
    }

    /// Claim a unique slug derived from `name`
    ///
    /// `index` is the document's position in its batch and seeds the fallback
    /// when the name normalises to fewer than three characters.
    pub fn claim(&mut self, name: &str, index: usize) -> String {
        let mut base = slugify(name);
        if !base.starts_with(|c: char| c.is_ascii_lowercase()) && !base.is_empty() {
            base = format!("{}-{}", self.prefix, base);
        }
        if base.len() < 3 {
            base = format!("{}-{}", self.prefix, index + 1);
        }

        let mut candidate = base.clone();
        let mut counter = 1;
        while self.used.contains(&candidate) {
            candidate = format!("{}-{}", base, counter);
            counter += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_normalises() {
        assert_eq!(slugify("Rust  Lovers' Club!"), "rust-lovers-club");
        assert_eq!(slugify("--Bay_Area--"), "bay-area");
        assert_eq!(slugify("Ünïcode Fans"), "ncode-fans");
    }

    #[test]
    fn test_claim_suffixes_collisions() {
        let mut registry = SlugRegistry::new("group");
        assert_eq!(registry.claim("Book Club", 0), "book-club");
        assert_eq!(registry.claim("Book Club", 1), "book-club-1");
        assert_eq!(registry.claim("book club", 2), "book-club-2");
    }

    #[test]
    fn test_claim_prefixes_and_falls_back() {
        let mut registry = SlugRegistry::new("group");
        assert_eq!(registry.claim("42 Runners", 0), "group-42-runners");
        assert_eq!(registry.claim("!!", 6), "group-7");
        assert_eq!(registry.claim("x", 6), "group-7-1");
    }
}
