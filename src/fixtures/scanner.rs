//! Per-file fixture collection via the pytest subprocess.

use std::path::Path;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use super::command::RunnerCommand;
use super::report::parse_fixtures_report;
use super::Fixture;

/// Flags appended to the configured command for every collection run.
const COLLECTION_FLAGS: &[&str] = &[
    "--verbose",
    "--fixtures",
    "--collect-only",
    "--continue-on-collection-errors",
];

/// Failure to run the configured pytest command.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to run `{command}`: {source}")]
    Process {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Run a fixture-collection report for `file` and parse its output.
///
/// The child runs with the workspace root as working directory, inherits
/// the environment, and gets `PYTHONPATH` overridden when the command
/// carries one. Standard output feeds the report parser; standard error is
/// logged and never parsed. A non-zero exit status is normal under
/// `--continue-on-collection-errors`, so the output is parsed regardless.
///
/// Each scan is a one-shot, best-effort attempt: no retries, no
/// cancellation. Overlapping scans of the same file are resolved by the
/// caller overwriting the cache entry, last write wins.
pub async fn collect_fixtures(
    command: &RunnerCommand,
    workspace_root: &Path,
    file: &Path,
) -> Result<Vec<Fixture>, ScanError> {
    let mut child = Command::new(&command.cmd);
    child
        .args(&command.args)
        .args(COLLECTION_FLAGS)
        .arg(file)
        .current_dir(workspace_root)
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true);
    if let Some(python_path) = &command.python_path {
        child.env("PYTHONPATH", python_path);
    }

    debug!(
        "Running fixture collection: {}$ {} {} {:?}",
        workspace_root.display(),
        command.display_line(),
        COLLECTION_FLAGS.join(" "),
        file
    );

    let output = child.output().await.map_err(|source| ScanError::Process {
        command: command.display_line(),
        source,
    })?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        debug!("pytest stderr:\n{}", stderr);
    }
    if !output.status.success() {
        // Collection errors still produce a usable report.
        warn!(
            "pytest exited with {} while collecting {:?}",
            output.status, file
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_fixtures_report(&stdout))
}
