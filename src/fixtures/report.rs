//! Parser for pytest's `--fixtures --collect-only` report.
//!
//! The report is free-form CLI text: section banners, declaration lines of
//! the shape `name -- path/to/file.py:123`, and four-space-indented
//! docstring lines underneath each declaration. The parser turns that text
//! into an ordered list of [`Fixture`] records and never fails; lines that
//! do not match any known shape are ignored.

use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;

use super::Fixture;

/// Declaration lines start with a word character, e.g.
/// `tmp_path -- /usr/lib/python3.11/site-packages/_pytest/tmpdir.py:199`.
static DECLARATION_START_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w").unwrap());

const SRC_PATH_SEP: &str = " -- ";
const DOCSTRING_INDENT: &str = "    ";
const NO_DOCSTRING_MARKER: &str = "no docstring";

/// One line of the report, classified.
#[derive(Debug)]
enum LineKind<'a> {
    /// Empty after trimming. Preserves blank lines inside a docstring.
    Blank,
    /// Four-space-indented docstring continuation, prefix stripped.
    Indented(&'a str),
    /// `name -- path:line`, fully parsed. Partial matches are `Other`.
    Declaration {
        name: &'a str,
        path: &'a str,
        line: usize,
    },
    /// Section banner starting with `--` or `==`.
    Separator,
    /// Anything else (collection notes, platform banner, ...). Ignored.
    Other,
}

fn classify(line: &str) -> LineKind<'_> {
    if line.trim().is_empty() {
        return LineKind::Blank;
    }
    if let Some(content) = line.strip_prefix(DOCSTRING_INDENT) {
        return LineKind::Indented(content);
    }
    if DECLARATION_START_RE.is_match(line) {
        return parse_declaration(line).unwrap_or(LineKind::Other);
    }
    if line.starts_with("--") || line.starts_with("==") {
        return LineKind::Separator;
    }
    LineKind::Other
}

/// Extract `name -- path:line` from a declaration line.
///
/// The name is the run of characters before the first space (pytest appends
/// scope annotations such as `[session scope]` after it), the path sits
/// between the first ` -- ` and the first `:` after it, and the line number
/// follows that colon. Returns `None` unless all three parts are present.
fn parse_declaration(line: &str) -> Option<LineKind<'_>> {
    let name = &line[..line.find(' ')?];
    let rest = &line[line.find(SRC_PATH_SEP)? + SRC_PATH_SEP.len()..];
    let colon = rest.find(':')?;
    let path = &rest[..colon];
    let lineno: usize = rest[colon + 1..].trim().parse().ok()?;
    Some(LineKind::Declaration {
        name,
        path,
        line: lineno,
    })
}

/// Parser state: either between fixtures, or collecting the docstring of
/// the most recent declaration. A collecting fixture is complete by
/// construction; flushing never sees a partially-built record.
enum State {
    Idle,
    Collecting {
        name: String,
        source_file: PathBuf,
        source_line: usize,
        docstring: String,
    },
}

impl State {
    /// Finish the in-progress fixture, if any, and push it to `out`.
    fn flush(&mut self, out: &mut Vec<Fixture>) {
        if let State::Collecting {
            name,
            source_file,
            source_line,
            docstring,
        } = std::mem::replace(self, State::Idle)
        {
            let trimmed = docstring.trim();
            out.push(Fixture {
                name,
                docstring: if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                },
                source_file,
                source_line,
            });
        }
    }
}

/// Parse the output of `pytest --verbose --fixtures --collect-only` into an
/// ordered list of fixtures.
///
/// Output order matches declaration order in the report. Fixtures reported
/// more than once (e.g. shadowed in different scopes) are all emitted. A
/// docstring consisting only of pytest's "no docstring available" marker
/// yields `docstring: None`.
pub fn parse_fixtures_report(report: &str) -> Vec<Fixture> {
    let mut fixtures = Vec::new();
    let mut state = State::Idle;

    for line in report.lines() {
        match classify(line) {
            LineKind::Blank => {
                if let State::Collecting { docstring, .. } = &mut state {
                    if !docstring.is_empty() {
                        docstring.push('\n');
                    }
                }
            }
            LineKind::Indented(content) => {
                if let State::Collecting { docstring, .. } = &mut state {
                    if !content.starts_with(NO_DOCSTRING_MARKER) {
                        if !docstring.is_empty() {
                            docstring.push('\n');
                        }
                        docstring.push_str(content);
                    }
                }
            }
            LineKind::Declaration { name, path, line } => {
                state.flush(&mut fixtures);
                state = State::Collecting {
                    name: name.to_string(),
                    source_file: PathBuf::from(path),
                    source_line: line,
                    docstring: String::new(),
                };
            }
            LineKind::Separator => state.flush(&mut fixtures),
            LineKind::Other => {}
        }
    }

    // A trailing fixture with no closing banner is still emitted.
    state.flush(&mut fixtures);
    fixtures
}
