//! Fixture discovery and lookup.
//!
//! This module provides the core functionality for offering pytest fixtures
//! in the editor:
//! - Parsing the textual report of a `pytest --fixtures --collect-only` run
//! - Deciding from cursor context when fixtures should be suggested
//! - Caching discovered fixtures per scanned file
//! - Resolving fixture names back to their definition sites

pub mod cli;
mod command;
mod report;
mod resolver;
mod scanner;
mod suggest;

pub use command::{CommandSetting, RunnerCommand};
pub use report::parse_fixtures_report;
pub use resolver::{extract_word_at_position, resolve_definitions, FixtureLocation};
pub use scanner::{collect_fixtures, ScanError};
pub use suggest::should_suggest_fixtures;

use std::path::{Path, PathBuf};

use dashmap::DashMap;
use tracing::debug;

/// One discovered test fixture.
///
/// Records are immutable once constructed and rebuilt from scratch on every
/// scan; `name` is unique only within a single file's result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    pub name: String,
    /// `None` when the runner reported no docstring.
    pub docstring: Option<String>,
    /// Definition file as reported by the runner, relative or absolute.
    pub source_file: PathBuf,
    /// 1-based line of the definition.
    pub source_line: usize,
}

/// Fixtures discovered per scanned file, keyed by absolute file path.
///
/// Uses `DashMap` for lock-free access from concurrent scan tasks. Entries
/// are wholesale replaced on every re-scan; overlapping scans of one file
/// race with last-write-wins semantics. Unbounded, no eviction.
#[derive(Debug, Default)]
pub struct FixtureCache {
    fixtures: DashMap<PathBuf, Vec<Fixture>>,
}

impl FixtureCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entry for `file_path` with a fresh scan result.
    pub fn insert(&self, file_path: PathBuf, fixtures: Vec<Fixture>) {
        debug!(
            "Caching {} fixtures for {:?}",
            fixtures.len(),
            file_path
        );
        self.fixtures.insert(file_path, fixtures);
    }

    /// The fixtures last discovered for `file_path`, or `None` when the
    /// file has not been scanned yet.
    pub fn get(&self, file_path: &Path) -> Option<Vec<Fixture>> {
        self.fixtures.get(file_path).map(|entry| entry.value().clone())
    }

    /// Number of files with a cached scan result.
    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }
}
