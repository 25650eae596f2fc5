//! Resolution of cached fixture records to source locations.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::Fixture;

/// A resolved definition site for a fixture name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureLocation {
    pub file_path: PathBuf,
    /// 1-based line of the definition, as reported by the runner.
    pub line: usize,
    /// 0-based character offset of the fixture name within that line.
    pub start_char: usize,
    pub end_char: usize,
}

/// Resolve every cached record matching `name` to a location.
///
/// Runner-reported paths are joined onto the workspace root unless already
/// absolute. The name's character offset is looked up in line `line - 1` of
/// the referenced file; when the line or the name is missing (the file has
/// changed since the scan) the location falls back to column 0 rather than
/// being dropped. Read failures propagate; callers treat them as a stale
/// cache, not a crash.
///
/// Multiple records with the same name (shadowed fixtures) yield one
/// location each, in cache order.
pub fn resolve_definitions(
    workspace_root: &Path,
    records: &[Fixture],
    name: &str,
) -> io::Result<Vec<FixtureLocation>> {
    let mut locations = Vec::new();

    for fixture in records.iter().filter(|f| f.name == name) {
        let file_path = if fixture.source_file.is_absolute() {
            fixture.source_file.clone()
        } else {
            workspace_root.join(&fixture.source_file)
        };

        let content = std::fs::read_to_string(&file_path)?;
        let start_char = content
            .lines()
            .nth(fixture.source_line.saturating_sub(1))
            .and_then(|line| char_offset_of(line, name))
            .unwrap_or(0);

        debug!(
            "Resolved fixture {} to {}:{}:{}",
            name,
            file_path.display(),
            fixture.source_line,
            start_char
        );
        locations.push(FixtureLocation {
            file_path,
            line: fixture.source_line,
            start_char,
            end_char: start_char + name.chars().count(),
        });
    }

    Ok(locations)
}

/// Character offset (not byte offset) of `needle` within `line`.
fn char_offset_of(line: &str, needle: &str) -> Option<usize> {
    let byte_offset = line.find(needle)?;
    Some(line[..byte_offset].chars().count())
}

/// The identifier under the cursor, where `character` is a 0-based
/// character offset into the line.
pub fn extract_word_at_position(line: &str, character: usize) -> Option<&str> {
    let chars: Vec<(usize, char)> = line.char_indices().collect();
    if chars.is_empty() {
        return None;
    }

    let is_word = |c: char| c.is_alphanumeric() || c == '_';

    // A cursor at the end of a word still refers to it.
    let mut idx = character.min(chars.len() - 1);
    if !is_word(chars[idx].1) {
        if idx == 0 || !is_word(chars[idx - 1].1) {
            return None;
        }
        idx -= 1;
    }

    let mut start = idx;
    while start > 0 && is_word(chars[start - 1].1) {
        start -= 1;
    }
    let mut end = idx;
    while end + 1 < chars.len() && is_word(chars[end + 1].1) {
        end += 1;
    }

    let start_byte = chars[start].0;
    let end_byte = chars[end].0 + chars[end].1.len_utf8();
    Some(&line[start_byte..end_byte])
}
