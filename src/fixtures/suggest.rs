//! Heuristic deciding when fixture completions should be offered.

use once_cell::sync::Lazy;
use regex::Regex;

/// A test function definition somewhere on the line, not anchored to the
/// line start (decorated or indented definitions still match).
static TEST_DEF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"def test_").unwrap());

/// Decide whether fixture names should be suggested at this cursor position.
///
/// Returns true only when the line contains a `def test_` signature and the
/// text before the cursor has an open `(` but no `)` yet, i.e. the cursor
/// sits inside a still-open parameter list. `document` is accepted so that
/// signatures spanning multiple lines can be supported later; it does not
/// affect the current single-line decision.
///
/// Any position between `(` and the first `)` qualifies; parameter lists
/// spanning multiple lines and fixture-function bodies are out of scope.
pub fn should_suggest_fixtures(line_text: &str, cursor_col: usize, _document: Option<&str>) -> bool {
    if !TEST_DEF_RE.is_match(line_text) {
        return false;
    }
    let mut open = false;
    for c in line_text.chars().take(cursor_col) {
        match c {
            '(' => open = true,
            ')' => return false,
            _ => {}
        }
    }
    open
}
