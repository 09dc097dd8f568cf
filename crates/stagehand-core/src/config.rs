//! Orchestrator configuration

use serde::{Deserialize, Serialize};

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Loaded resources whose name starts with one of these prefixes are
    /// never unloaded
    pub protected_prefixes: Vec<String>,
    /// Rule for deriving resource names from registered paths
    pub catalog: CatalogConfig,
    /// Options used when a request does not supply its own
    pub default_options: TransitionOptions,
}

impl OrchestratorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a protected name prefix
    #[inline]
    #[must_use]
    pub fn with_protected_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.protected_prefixes.push(prefix.into());
        self
    }

    /// With catalog naming rule
    #[inline]
    #[must_use]
    pub fn with_catalog(mut self, catalog: CatalogConfig) -> Self {
        self.catalog = catalog;
        self
    }

    /// With default transition options
    #[inline]
    #[must_use]
    pub fn with_default_options(mut self, options: TransitionOptions) -> Self {
        self.default_options = options;
        self
    }

    /// Whether `name` is exempt from unloading
    #[must_use]
    pub fn is_protected(&self, name: &str) -> bool {
        self.protected_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            protected_prefixes: Vec::new(),
            catalog: CatalogConfig::default(),
            default_options: TransitionOptions::default(),
        }
    }
}

/// Naming rule for registered paths: `<root>/(<dir>/)*<name>.<extension>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Leading path segment every registered path starts with; empty
    /// accepts any directory
    pub root: String,
    /// File extension without the dot
    pub extension: String,
}

impl CatalogConfig {
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self::new("Assets", "unity")
    }
}

/// How the load half of a transition schedules its resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStrategy {
    /// One resource at a time, in descriptor order
    #[default]
    Sequential,
    /// All loads started together and committed together
    Batched,
}

/// Per-transition options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionOptions {
    /// Load a resource again even if the host already has it
    pub allow_duplicate_load: bool,
    /// Load scheduling
    pub load_strategy: LoadStrategy,
}

impl TransitionOptions {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_duplicate_load(mut self, allow: bool) -> Self {
        self.allow_duplicate_load = allow;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_strategy(mut self, strategy: LoadStrategy) -> Self {
        self.load_strategy = strategy;
        self
    }
}
