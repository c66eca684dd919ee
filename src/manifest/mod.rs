//! The JAR manifest data model.
//!
//! References about .jar/.apk manifest files:
//!  - https://docs.oracle.com/javase/7/docs/technotes/guides/jar/jar.html
//!
//! A [`Manifest`] maps section names to [`Attributes`].  The main section has the empty name and
//! is always written first, without a `Name:` header.  Attribute lines are kept as raw text so
//! that a parsed manifest is written back byte-for-byte.

mod parse;
mod write;

use std::collections::{btree_map, BTreeMap};

/// Ordered raw `Key: Value` lines of one manifest section.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes(Vec<String>);

fn key_prefix(key: &str) -> String {
    format!("{key}: ")
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.0.push(line.into());
    }

    /// Appends a `key: value` line.
    pub fn insert(&mut self, key: &str, value: &str) {
        self.0.push(format!("{key}: {value}"));
    }

    /// Returns the value of the first line with the given key, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        let prefix = key_prefix(key);
        self.0.iter().find_map(|line| line.strip_prefix(&prefix))
    }

    /// Drops the first line with the given key, keeping the order of the others.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let prefix = key_prefix(key);
        let idx = self.0.iter().position(|line| line.starts_with(&prefix))?;
        Some(self.0.remove(idx))
    }

    /// Like [`Attributes::remove()`], but by value.
    pub fn without(mut self, key: &str) -> Self {
        self.remove(key);
        self
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Attributes {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for Attributes {
    fn from(lines: [S; N]) -> Self {
        lines.into_iter().collect()
    }
}

/// A parsed manifest or signature file: section name to attribute lines.
///
/// The sections are kept in a [`BTreeMap`], which gives the sorted output order for free and
/// makes the main section (named `""`) come first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    sections: BTreeMap<String, Attributes>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manifest holding only the given main section.
    pub fn with_main(main: Attributes) -> Self {
        let mut manifest = Self::new();
        manifest.set_main(main);
        manifest
    }

    pub fn main(&self) -> Option<&Attributes> {
        self.sections.get("")
    }

    pub fn set_main(&mut self, main: Attributes) {
        self.sections.insert(String::new(), main);
    }

    pub fn section(&self, name: &str) -> Option<&Attributes> {
        self.sections.get(name)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Attributes> {
        self.sections.get_mut(name)
    }

    /// Sets the attributes for a named section, returning the previous ones.
    pub fn insert(&mut self, name: impl Into<String>, attributes: Attributes) -> Option<Attributes> {
        self.sections.insert(name.into(), attributes)
    }

    pub fn remove(&mut self, name: &str) -> Option<Attributes> {
        self.sections.remove(name)
    }

    /// Iterates over the named (per-entry) sections in sorted order, skipping the main section.
    pub fn entries(&self) -> Entries<'_> {
        Entries {
            inner: self.sections.iter(),
        }
    }
}

/// Iterator over the named sections of a [`Manifest`], see [`Manifest::entries()`].
#[derive(Debug)]
pub struct Entries<'a> {
    inner: btree_map::Iter<'a, String, Attributes>,
}

impl<'a> Iterator for Entries<'a> {
    type Item = (&'a str, &'a Attributes);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .find(|(name, _)| !name.is_empty())
            .map(|(name, attrs)| (name.as_str(), attrs))
    }
}

#[cfg(test)]
mod test {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_attributes_remove() {
        let attrs = Attributes::from(["A: 1", "SHA1-Digest: old", "B: 2", "SHA1-Digest: older"]);

        assert_eq!(attrs.get("SHA1-Digest"), Some("old"));
        assert_eq!(attrs.get("SHA1"), None);

        // only the first match goes, the order of the others is kept
        let attrs = attrs.without("SHA1-Digest");
        assert_eq!(
            attrs,
            Attributes::from(["A: 1", "B: 2", "SHA1-Digest: older"])
        );

        // prefixes of a key don't match
        let attrs = attrs.without("B:");
        assert_eq!(attrs.len(), 3);
        let attrs = attrs.without("SHA1");
        assert_eq!(attrs.len(), 3);
    }

    #[test]
    fn test_attributes_get_requires_separator() {
        let attrs = Attributes::from(["SHA1-Digest-Manifest: abc"]);
        assert_eq!(attrs.get("SHA1-Digest"), None);
        assert_eq!(attrs.get("SHA1-Digest-Manifest"), Some("abc"));
    }

    #[test]
    fn test_entries_skip_main() {
        let mut manifest = Manifest::with_main(Attributes::from(["Manifest-Version: 1.0"]));
        manifest.insert("b", Attributes::from(["X: 2"]));
        manifest.insert("a", Attributes::from(["X: 1"]));

        let names: Vec<_> = manifest.entries().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(manifest.main().unwrap().get("Manifest-Version"), Some("1.0"));
    }
}
