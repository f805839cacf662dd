use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use super::ValidationError;

/// Username used when a display name has nothing left after slugification.
pub const DEFAULT_USERNAME: &str = "me";

/// Derive the URL-safe username for a display name.
///
/// The name is lowercased and decomposed (NFD) so accents fall away as
/// combining marks; anything outside `a-z`, `0-9`, whitespace and `-` is
/// dropped, and runs of whitespace or hyphens become a single `-`.
pub fn slugify(input: &str) -> String {
    let lowered = input.to_lowercase();
    let kept: String = lowered
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .filter(|ch| {
            ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch.is_whitespace() || *ch == '-'
        })
        .collect();

    let mut slug = String::with_capacity(kept.len());
    for ch in kept.trim().chars() {
        if ch.is_whitespace() || ch == '-' {
            if !slug.ends_with('-') {
                slug.push('-');
            }
        } else {
            slug.push(ch);
        }
    }

    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        DEFAULT_USERNAME.to_string()
    } else {
        slug.to_string()
    }
}

pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let is_valid = !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    if is_valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidSlug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic_names() {
        assert_eq!(slugify("Jane Doe"), "jane-doe");
        assert_eq!(slugify("  Jane   Doe  "), "jane-doe");
        assert_eq!(slugify("DJ Shadow 2"), "dj-shadow-2");
    }

    #[test]
    fn test_slugify_strips_diacritics() {
        assert_eq!(slugify("Björk Guðmundsdóttir"), "bjork-gumundsdottir");
        assert_eq!(slugify("Sigur Rós"), "sigur-ros");
        assert_eq!(slugify("Émilie Simon"), "emilie-simon");
        assert_eq!(slugify("Beyoncé"), "beyonce");
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("a - b"), "a-b");
        assert_eq!(slugify("a--b"), "a-b");
        assert_eq!(slugify("a\t\nb"), "a-b");
        assert_eq!(slugify("-edge-"), "edge");
    }

    #[test]
    fn test_slugify_drops_punctuation() {
        assert_eq!(slugify("Guns N' Roses!"), "guns-n-roses");
        assert_eq!(slugify("AC/DC"), "acdc");
    }

    #[test]
    fn test_slugify_empty_defaults_to_me() {
        assert_eq!(slugify(""), DEFAULT_USERNAME);
        assert_eq!(slugify("   "), DEFAULT_USERNAME);
        assert_eq!(slugify("!!!"), DEFAULT_USERNAME);
        assert_eq!(slugify("日本"), DEFAULT_USERNAME);
    }

    #[test]
    fn test_slugify_is_idempotent() {
        for name in ["Jane Doe", "Sigur Rós", "  --x--  ", "", "Ünïcödé  Nämé", "me"] {
            let once = slugify(name);
            assert_eq!(slugify(&once), once, "input {name:?}");
            assert!(validate_slug(&once).is_ok(), "slug {once:?} should validate");
        }
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("jane-doe").is_ok());
        assert!(validate_slug("a1").is_ok());
        assert_eq!(validate_slug(""), Err(ValidationError::InvalidSlug));
        assert!(validate_slug("Jane").is_err());
        assert!(validate_slug("-jane").is_err());
        assert!(validate_slug("jane-").is_err());
        assert!(validate_slug("ja--ne").is_err());
        assert!(validate_slug("ja_ne").is_err());
    }
}
