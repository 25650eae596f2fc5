//! Server configuration received over LSP.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::fixtures::{CommandSetting, RunnerCommand};

/// Clients may nest our settings under this key in `initializationOptions`
/// or `workspace/didChangeConfiguration` payloads.
pub const SETTINGS_SECTION_KEY: &str = "pytestFixtures";

/// Effective server settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerSettings {
    /// The configured test-runner command. `None` is a reportable
    /// configuration problem; callers fall back to a bare `pytest`.
    pub command: Option<CommandSetting>,
    /// Auxiliary module search path propagated as `PYTHONPATH`.
    pub python_path: Option<String>,
}

impl ServerSettings {
    /// Build settings from an LSP payload, starting from defaults.
    pub fn from_lsp_payload(payload: Option<&Value>) -> Self {
        let mut settings = Self::default();
        if let Some(payload) = payload {
            settings = settings.merged_with_payload(payload);
        }
        settings
    }

    /// Return a copy updated with a configuration payload, accepting both
    /// root-level keys and a `pytestFixtures`-scoped section.
    pub fn merged_with_payload(&self, payload: &Value) -> Self {
        let mut merged = self.clone();

        for candidate in payload_candidates(payload) {
            if let Ok(patch) = serde_json::from_value::<ServerSettingsPatch>(candidate.clone()) {
                merged.apply_patch(patch);
            }
        }

        merged.normalize();
        merged
    }

    fn apply_patch(&mut self, patch: ServerSettingsPatch) {
        if let Some(command) = patch.command {
            self.command = Some(command);
        }
        if let Some(python_path) = patch.python_path {
            self.python_path = Some(python_path);
        }
    }

    fn normalize(&mut self) {
        if let Some(CommandSetting::CommandLine(line)) = &self.command {
            if line.trim().is_empty() {
                self.command = None;
            }
        }
        if let Some(python_path) = &self.python_path {
            let trimmed = python_path.trim();
            self.python_path = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }
    }

    /// The runner command from the configured value, with the Python path
    /// attached. `None` when no command is configured; the caller decides
    /// how to degrade (warn once, use the bare default).
    pub fn runner_command(&self) -> Option<RunnerCommand> {
        self.command
            .as_ref()
            .map(|value| RunnerCommand::parse(value).with_python_path(self.python_path.clone()))
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ServerSettingsPatch {
    command: Option<CommandSetting>,
    python_path: Option<String>,
    #[serde(flatten)]
    _extra: HashMap<String, Value>,
}

fn payload_candidates(payload: &Value) -> Vec<Value> {
    let mut candidates = Vec::new();
    candidates.push(payload.clone());

    if let Some(scoped) = payload.get(SETTINGS_SECTION_KEY) {
        candidates.push(scoped.clone());
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_command_from_root_payload() {
        let settings = ServerSettings::from_lsp_payload(Some(&json!({
            "command": "python -m pytest",
        })));
        let command = settings.runner_command().unwrap();
        assert_eq!(command.cmd, "python");
        assert_eq!(command.args, vec!["-m", "pytest"]);
    }

    #[test]
    fn test_argv_command_from_scoped_payload() {
        let settings = ServerSettings::from_lsp_payload(Some(&json!({
            "pytestFixtures": {
                "command": ["pytest", "-q"],
                "pythonPath": "src",
            }
        })));
        let command = settings.runner_command().unwrap();
        assert_eq!(command.cmd, "pytest");
        assert_eq!(command.args, vec!["-q"]);
        assert_eq!(command.python_path.as_deref(), Some("src"));
    }

    #[test]
    fn test_missing_command_yields_none() {
        let settings = ServerSettings::from_lsp_payload(Some(&json!({})));
        assert!(settings.runner_command().is_none());

        let settings = ServerSettings::from_lsp_payload(None);
        assert!(settings.runner_command().is_none());
    }

    #[test]
    fn test_blank_values_are_dropped() {
        let settings = ServerSettings::from_lsp_payload(Some(&json!({
            "command": "   ",
            "pythonPath": "",
        })));
        assert!(settings.command.is_none());
        assert!(settings.python_path.is_none());
    }

    #[test]
    fn test_reconfiguration_keeps_unpatched_fields() {
        let initial = ServerSettings::from_lsp_payload(Some(&json!({
            "command": "pytest",
            "pythonPath": "lib",
        })));
        let updated = initial.merged_with_payload(&json!({"command": ["tox", "-e", "py"]}));
        assert_eq!(
            updated.command,
            Some(CommandSetting::Argv(vec![
                "tox".into(),
                "-e".into(),
                "py".into()
            ]))
        );
        assert_eq!(updated.python_path.as_deref(), Some("lib"));
    }
}
