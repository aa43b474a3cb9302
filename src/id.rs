//! `@id` classification
//!
//! Sorts entity ids into the shapes schema rules care about: the root
//! entity, relative or absolute paths, fragments and absolute URIs.

use crate::vocab::ROOT_ENTITY_ID;

/// Classification of an entity @id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// Root entity: "./"
    Root,
    /// Relative path: "./foo", "./foo/bar/", "foo/bar"
    Relative,
    /// Absolute filesystem path: "/data/foo"
    AbsolutePath,
    /// Fragment identifier: "#person1", "#dmp:1"
    Fragment,
    /// Absolute URI: "https://...", "urn:..."
    Absolute,
    /// Metadata descriptor: top-level "ro-crate-metadata.json" or a
    /// prefixed variant such as "x-ro-crate-metadata.json"
    MetadataDescriptor,
    /// Empty, whitespace or control characters; satisfies no other kind
    Malformed,
}

/// Classify an @id string
pub fn classify_id(id: &str) -> IdKind {
    if id.trim().is_empty() || id.chars().any(|c| c.is_control()) {
        IdKind::Malformed
    } else if id == ROOT_ENTITY_ID {
        IdKind::Root
    } else if is_descriptor_name(id) {
        IdKind::MetadataDescriptor
    } else if id.starts_with('#') {
        IdKind::Fragment
    } else if has_scheme(id) {
        IdKind::Absolute
    } else if id.starts_with('/') {
        IdKind::AbsolutePath
    } else {
        IdKind::Relative
    }
}

/// A metadata file name at the top of the crate; nested copies are files
fn is_descriptor_name(id: &str) -> bool {
    let name = id.strip_prefix("./").unwrap_or(id);
    name.ends_with("ro-crate-metadata.json") && !name.contains('/') && !has_scheme(name)
}

/// `scheme:` prefix per RFC 3986 (letter, then letters/digits/+/-/.)
fn has_scheme(id: &str) -> bool {
    match id.split_once(':') {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
                // a single letter is a Windows drive, not a scheme
                && scheme.len() > 1
        }
        None => false,
    }
}

/// Whether an id names a directory (ends with "/")
pub fn is_directory_id(id: &str) -> bool {
    id.ends_with('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_id() {
        assert_eq!(classify_id("./"), IdKind::Root);
        assert_eq!(classify_id("./data.csv"), IdKind::Relative);
        assert_eq!(classify_id("./experiments/"), IdKind::Relative);
        assert_eq!(classify_id("data.csv"), IdKind::Relative);
        assert_eq!(classify_id("/data/raw.csv"), IdKind::AbsolutePath);
        assert_eq!(classify_id("#person1"), IdKind::Fragment);
        assert_eq!(classify_id("#dmp:1"), IdKind::Fragment);
        assert_eq!(classify_id("https://orcid.org/0000-0001"), IdKind::Absolute);
        assert_eq!(classify_id("urn:uuid:1234"), IdKind::Absolute);
        assert_eq!(classify_id("ro-crate-metadata.json"), IdKind::MetadataDescriptor);
        assert_eq!(
            classify_id("prefix-ro-crate-metadata.json"),
            IdKind::MetadataDescriptor
        );
    }

    #[test]
    fn test_nested_metadata_file_is_relative() {
        assert_eq!(classify_id("./ro-crate-metadata.json"), IdKind::MetadataDescriptor);
        assert_eq!(classify_id("sub/ro-crate-metadata.json"), IdKind::Relative);
        assert_eq!(classify_id("./sub/ro-crate-metadata.json"), IdKind::Relative);
        assert_eq!(classify_id("/ro-crate-metadata.json"), IdKind::AbsolutePath);
    }

    #[test]
    fn test_malformed_ids() {
        assert_eq!(classify_id(""), IdKind::Malformed);
        assert_eq!(classify_id("   "), IdKind::Malformed);
        assert_eq!(classify_id("data\n.csv"), IdKind::Malformed);
    }

    #[test]
    fn test_drive_letter_is_not_a_scheme() {
        assert_eq!(classify_id("C:data"), IdKind::Relative);
    }
}
