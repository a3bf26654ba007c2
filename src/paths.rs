// Portable photo paths
//
// Absolute paths under well-known directories are stored as `{{Symbol}}/rest`
// so they survive the directory moving between installs.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// One native prefix and the symbol standing in for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    pub prefix: String,
    pub symbol: String,
}

/// Ordered prefix substitutions; the first match wins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSubstitutions {
    entries: Vec<Substitution>,
}

impl PathSubstitutions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, prefix: impl Into<String>, symbol: impl Into<String>) -> Self {
        self.entries.push(Substitution {
            prefix: prefix.into(),
            symbol: symbol.into(),
        });
        self
    }

    /// Typical layout: the app's document and cache directories under `root`
    pub fn for_root(root: &Path) -> Self {
        Self::new()
            .with(root.join("documents").to_string_lossy(), "DocumentDir")
            .with(root.join("cache").to_string_lossy(), "CacheDir")
    }

    pub fn entries(&self) -> &[Substitution] {
        &self.entries
    }

    /// Replace the first matching native prefix with its symbol
    pub fn reduce(&self, path: &str) -> String {
        for entry in &self.entries {
            if let Some(rest) = path.strip_prefix(entry.prefix.as_str()) {
                return format!("{{{{{}}}}}{}", entry.symbol, rest);
            }
        }
        path.to_string()
    }

    /// Replace a leading `{{Symbol}}` with its native prefix
    pub fn expand(&self, path: &str) -> String {
        for entry in &self.entries {
            let token = format!("{{{{{}}}}}", entry.symbol);
            if let Some(rest) = path.strip_prefix(token.as_str()) {
                return format!("{}{}", entry.prefix, rest);
            }
        }
        path.to_string()
    }
}
