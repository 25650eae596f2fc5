//! Integration tests for the suggestion gate and the command tokenizer.

use ntest::timeout;
use pytest_fixture_server::{should_suggest_fixtures, CommandSetting, RunnerCommand};

#[test]
#[timeout(30000)]
fn test_suggests_inside_open_parameter_list() {
    assert!(should_suggest_fixtures("def test_foo(", 14, None));
}

#[test]
#[timeout(30000)]
fn test_no_suggestion_after_closing_paren() {
    assert!(!should_suggest_fixtures("def test_foo()", 15, None));
}

#[test]
#[timeout(30000)]
fn test_no_suggestion_for_non_test_function() {
    assert!(!should_suggest_fixtures("def helper(", 11, None));
}

#[test]
#[timeout(30000)]
fn test_no_suggestion_before_open_paren() {
    assert!(!should_suggest_fixtures("def test_foo(a):", 8, None));
}

#[test]
#[timeout(30000)]
fn test_suggests_between_existing_parameters() {
    let line = "def test_upload(client, ):";
    assert!(should_suggest_fixtures(line, 24, None));
}

#[test]
#[timeout(30000)]
fn test_cursor_past_line_end_is_clamped_to_line() {
    // A column beyond the line length still sees the whole prefix.
    assert!(should_suggest_fixtures("def test_foo(", 100, None));
}

#[test]
#[timeout(30000)]
fn test_document_text_does_not_change_the_decision() {
    let document = "def test_foo(\n    tmp_path,\n):\n    pass\n";
    // Multi-line signatures are out of scope: the second signature line on
    // its own never matches, with or without the document.
    assert!(!should_suggest_fixtures("    tmp_path,", 4, Some(document)));
    assert!(should_suggest_fixtures("def test_foo(", 13, Some(document)));
}

#[test]
#[timeout(30000)]
fn test_command_line_tokenization() {
    let command = RunnerCommand::parse(&CommandSetting::CommandLine("pytest -x -v".to_string()));
    assert_eq!(command.cmd, "pytest");
    assert_eq!(command.args, vec!["-x".to_string(), "-v".to_string()]);
}

#[test]
#[timeout(30000)]
fn test_empty_argv_yields_empty_command() {
    let command = RunnerCommand::parse(&CommandSetting::Argv(Vec::new()));
    assert_eq!(command.cmd, "");
    assert!(command.args.is_empty());
}

#[test]
#[timeout(30000)]
fn test_python_path_is_attached_after_tokenization() {
    let command = RunnerCommand::parse(&CommandSetting::CommandLine("python -m pytest".to_string()))
        .with_python_path(Some("src".to_string()));
    assert_eq!(command.cmd, "python");
    assert_eq!(command.args, vec!["-m".to_string(), "pytest".to_string()]);
    assert_eq!(command.python_path.as_deref(), Some("src"));
}

#[test]
#[timeout(30000)]
fn test_command_setting_deserializes_both_shapes() {
    let line: CommandSetting = serde_json::from_str("\"pytest -q\"").unwrap();
    assert_eq!(line, CommandSetting::CommandLine("pytest -q".to_string()));

    let argv: CommandSetting = serde_json::from_str("[\"pytest\", \"-q\"]").unwrap();
    assert_eq!(
        argv,
        CommandSetting::Argv(vec!["pytest".to_string(), "-q".to_string()])
    );
}
