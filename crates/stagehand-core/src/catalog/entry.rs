//! Catalog entries and the path naming rule

use crate::config::CatalogConfig;
use crate::error::CatalogError;
use regex::{Regex, RegexBuilder};

/// One registered resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    index: usize,
    path: String,
    name: String,
}

impl CatalogEntry {
    /// Registration index reported by the host
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Canonical path as registered
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Name derived from the path, original casing
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lookup key: derived name, lowercased
    #[inline]
    #[must_use]
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Compiled form of [`CatalogConfig`]
///
/// `Assets/Foo/Scenes/Main.unity` derives `Main`. Matching ignores case.
#[derive(Debug, Clone)]
pub struct NamingRule {
    pattern: Regex,
}

impl NamingRule {
    /// Compile the rule for `config`
    ///
    /// # Errors
    /// `CatalogError::InvalidRule` if the resulting pattern does not compile.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let root = config.root.trim_end_matches('/');
        let prefix = if root.is_empty() {
            String::new()
        } else {
            format!("{}/", regex::escape(root))
        };
        let source = format!(
            r"^{prefix}(?:.+/)*([^/]+)\.{}$",
            regex::escape(&config.extension)
        );

        let pattern = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|e| CatalogError::InvalidRule(e.to_string()))?;

        Ok(Self { pattern })
    }

    /// Derive a resource name from a registered path
    #[must_use]
    pub fn derive_name<'p>(&self, path: &'p str) -> Option<&'p str> {
        self.pattern
            .captures(path)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str())
    }

    /// Build an entry for the path at `index`
    ///
    /// # Errors
    /// `CatalogError::UnrecognisedPath` if the path does not follow the rule.
    pub fn entry(&self, index: usize, path: &str) -> Result<CatalogEntry, CatalogError> {
        let name = self
            .derive_name(path)
            .ok_or_else(|| CatalogError::UnrecognisedPath {
                path: path.to_string(),
            })?;

        Ok(CatalogEntry {
            index,
            path: path.to_string(),
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_file_stem() {
        let rule = NamingRule::new(&CatalogConfig::default()).unwrap();
        assert_eq!(rule.derive_name("Assets/Foo/Scenes/Main.unity"), Some("Main"));
        assert_eq!(rule.derive_name("Assets/Main.unity"), Some("Main"));
        assert_eq!(rule.derive_name("assets/scenes/Lobby.UNITY"), Some("Lobby"));
    }

    #[test]
    fn rejects_paths_outside_rule() {
        let rule = NamingRule::new(&CatalogConfig::default()).unwrap();
        assert_eq!(rule.derive_name("Packages/Main.unity"), None);
        assert_eq!(rule.derive_name("Assets/Main.prefab"), None);
        assert_eq!(rule.derive_name("Assets/.unity"), None);
    }

    #[test]
    fn empty_root_accepts_any_directory() {
        let rule = NamingRule::new(&CatalogConfig::new("", "scene")).unwrap();
        assert_eq!(rule.derive_name("levels/forest/Clearing.scene"), Some("Clearing"));
        assert_eq!(rule.derive_name("Clearing.scene"), Some("Clearing"));
    }

    #[test]
    fn names_keep_spaces_and_punctuation() {
        let rule = NamingRule::new(&CatalogConfig::default()).unwrap();
        let entry = rule
            .entry(3, "Assets/Tests/__DO_NOT_BUILD__TEST_SCENE A-1.unity")
            .unwrap();
        assert_eq!(entry.name(), "__DO_NOT_BUILD__TEST_SCENE A-1");
        assert_eq!(entry.index(), 3);
        assert_eq!(entry.key(), "__do_not_build__test_scene a-1");
    }
}
