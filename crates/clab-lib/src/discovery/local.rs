//! Topology file search in the workspace

use crate::error::FinderError;
use async_trait::async_trait;
use glob::{glob, Pattern};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Patterns matching containerlab topology definitions
pub const TOPOLOGY_PATTERNS: [&str; 2] = ["**/*.clab.yml", "**/*.clab.yaml"];

/// Dependency directories never hold labs of interest
pub const IGNORE_PATTERN: &str = "**/node_modules/**";

/// Trait for locating topology files that may or may not be deployed
#[async_trait]
pub trait TopologyFinder: Send + Sync {
    async fn find_topology_files(&self) -> Result<Vec<PathBuf>, FinderError>;
}

/// Finds topology files under a workspace root with glob patterns
#[derive(Debug, Clone)]
pub struct GlobFinder {
    root: PathBuf,
    patterns: Vec<String>,
    ignore: String,
}

impl GlobFinder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            patterns: TOPOLOGY_PATTERNS.iter().map(|p| p.to_string()).collect(),
            ignore: IGNORE_PATTERN.to_string(),
        }
    }

    /// Create with custom patterns, relative to the root
    pub fn with_patterns(
        root: impl Into<PathBuf>,
        patterns: Vec<String>,
        ignore: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            patterns,
            ignore: ignore.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn search(root: &Path, patterns: &[String], ignore: &str) -> Result<Vec<PathBuf>, FinderError> {
        let ignore = Pattern::new(ignore).map_err(|source| FinderError::Pattern {
            pattern: ignore.to_string(),
            source,
        })?;
        let base = Pattern::escape(&root.to_string_lossy());

        let mut found = Vec::new();
        for pattern in patterns {
            let full = format!("{}/{}", base.trim_end_matches('/'), pattern);
            let paths = glob(&full).map_err(|source| FinderError::Pattern {
                pattern: full.clone(),
                source,
            })?;

            for path in paths.flatten() {
                if ignore.matches_path(&path) {
                    continue;
                }
                found.push(path);
            }
        }

        found.sort();
        found.dedup();
        Ok(found)
    }
}

#[async_trait]
impl TopologyFinder for GlobFinder {
    async fn find_topology_files(&self) -> Result<Vec<PathBuf>, FinderError> {
        let root = self.root.clone();
        let patterns = self.patterns.clone();
        let ignore = self.ignore.clone();

        let found =
            tokio::task::spawn_blocking(move || Self::search(&root, &patterns, &ignore)).await??;

        debug!(
            root = %self.root.display(),
            count = found.len(),
            "Searched workspace for topology files"
        );
        Ok(found)
    }
}
