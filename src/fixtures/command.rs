//! Tokenization of the configured pytest command.

use serde::Deserialize;

/// The configured test-runner command, either a single command line or an
/// already-split argument vector.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CommandSetting {
    CommandLine(String),
    Argv(Vec<String>),
}

/// A runnable pytest invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunnerCommand {
    /// Executable name or path.
    pub cmd: String,
    /// Arguments preceding the collection flags.
    pub args: Vec<String>,
    /// Value for `PYTHONPATH` in the child environment. Attached by the
    /// settings layer, never produced by tokenization.
    pub python_path: Option<String>,
}

impl RunnerCommand {
    /// Tokenize a configured command value.
    ///
    /// Command lines are split on single spaces with no quoting support, so
    /// an executable path containing a space will be mis-split; argv arrays
    /// are taken as-is. The first token becomes `cmd`, the rest `args`. An
    /// empty value yields an empty `cmd`.
    pub fn parse(value: &CommandSetting) -> Self {
        let mut tokens: Vec<String> = match value {
            CommandSetting::CommandLine(line) => line.split(' ').map(str::to_string).collect(),
            CommandSetting::Argv(argv) => argv.clone(),
        };
        let cmd = if tokens.is_empty() {
            String::new()
        } else {
            tokens.remove(0)
        };
        Self {
            cmd,
            args: tokens,
            python_path: None,
        }
    }

    /// The bare fallback used when no command is configured.
    pub fn default_runner() -> Self {
        Self {
            cmd: "pytest".to_string(),
            args: Vec::new(),
            python_path: None,
        }
    }

    /// Attach a `PYTHONPATH` override for the child process.
    pub fn with_python_path(mut self, python_path: Option<String>) -> Self {
        self.python_path = python_path;
        self
    }

    /// One-line rendering for logs.
    pub fn display_line(&self) -> String {
        if self.args.is_empty() {
            self.cmd.clone()
        } else {
            format!("{} {}", self.cmd, self.args.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_is_split_on_spaces() {
        let command = RunnerCommand::parse(&CommandSetting::CommandLine("pytest -x -v".into()));
        assert_eq!(command.cmd, "pytest");
        assert_eq!(command.args, vec!["-x", "-v"]);
        assert_eq!(command.python_path, None);
    }

    #[test]
    fn test_argv_is_copied_without_resplitting() {
        let argv = vec!["python".to_string(), "-m".to_string(), "pytest".to_string()];
        let command = RunnerCommand::parse(&CommandSetting::Argv(argv));
        assert_eq!(command.cmd, "python");
        assert_eq!(command.args, vec!["-m", "pytest"]);
    }

    #[test]
    fn test_empty_inputs_yield_empty_command() {
        let command = RunnerCommand::parse(&CommandSetting::CommandLine(String::new()));
        assert_eq!(command.cmd, "");
        assert!(command.args.is_empty());

        let command = RunnerCommand::parse(&CommandSetting::Argv(Vec::new()));
        assert_eq!(command.cmd, "");
        assert!(command.args.is_empty());
    }
}
