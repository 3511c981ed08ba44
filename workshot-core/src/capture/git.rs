//! Git repository state capturer.

use serde_json::Value;
use tracing::{debug, info};

use super::command::{CommandRunner, SystemCommandRunner};
use super::{Capturer, PluginData};
use crate::{Result, WorkshotError};

pub const PLUGIN_NAME: &str = "git";
pub const PRIORITY: i32 = 10;

pub const KEY_BRANCH: &str = "branch";
pub const KEY_REMOTE: &str = "remote";
pub const KEY_DIRTY: &str = "dirty";
pub const KEY_COMMIT: &str = "commit";
pub const KEY_STASH_COUNT: &str = "stash_count";

const SHORT_HASH_LEN: usize = 7;
const DETACHED_HEAD: &str = "HEAD";

/// Captures branch, origin remote, dirty flag, short commit and stash count,
/// and restores the branch with `git checkout`.
///
/// Runs first: other capturers may assume the repository context is settled.
#[derive(Debug, Clone, Default)]
pub struct GitCapturer<R = SystemCommandRunner> {
    runner: R,
}

impl GitCapturer<SystemCommandRunner> {
    /// Capturer running the real `git` in the process working directory
    pub fn with_timeout(timeout: std::time::Duration) -> Self {
        Self::new(SystemCommandRunner::new(timeout))
    }
}

impl<R: CommandRunner> GitCapturer<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    fn git(&self, args: &[&str]) -> Option<String> {
        match self.runner.run("git", args) {
            Ok(output) => output.trimmed_stdout().map(str::to_owned),
            Err(e) => {
                debug!(error = %e, "git {} unavailable", args.join(" "));
                None
            }
        }
    }

    fn is_repo(&self) -> bool {
        matches!(self.runner.run("git", &["rev-parse", "--git-dir"]), Ok(output) if output.success)
    }

    fn current_branch(&self) -> Option<String> {
        self.git(&["rev-parse", "--abbrev-ref", "HEAD"])
            .filter(|branch| branch != DETACHED_HEAD)
    }

    fn remote_url(&self) -> Option<String> {
        self.git(&["config", "--get", "remote.origin.url"])
    }

    fn is_dirty(&self) -> Option<bool> {
        let output = self.runner.run("git", &["status", "--porcelain"]).ok()?;
        output
            .success
            .then(|| !output.stdout.trim().is_empty())
    }

    fn short_commit(&self) -> Option<String> {
        self.git(&["rev-parse", "HEAD"])
            .map(|hash| hash.chars().take(SHORT_HASH_LEN).collect())
    }

    fn stash_count(&self) -> usize {
        self.git(&["stash", "list"])
            .map(|listing| listing.lines().filter(|line| !line.trim().is_empty()).count())
            .unwrap_or(0)
    }
}

/// Saved branch, if it is a legal branch name
///
/// Values that `git checkout` would read as an option never get through.
fn target_branch(data: &PluginData) -> Option<&str> {
    data.get(KEY_BRANCH)
        .and_then(Value::as_str)
        .filter(|branch| is_valid_branch_name(branch))
}

/// Local subset of `git check-ref-format --branch`
fn is_valid_branch_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && !name.starts_with('/')
        && !name.ends_with('/')
        && !name.ends_with('.')
        && !name.ends_with(".lock")
        && name != "@"
        && !name.contains("..")
        && !name.contains("//")
        && !name.contains("@{")
        && !name.split('/').any(|part| part.starts_with('.'))
        && !name
            .chars()
            .any(|c| c.is_control() || c.is_whitespace() || "~^:?*[\\".contains(c))
}

impl<R: CommandRunner> Capturer for GitCapturer<R> {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn capture(&self) -> Result<Option<PluginData>> {
        if !self.is_repo() {
            debug!("not inside a git repository, nothing to capture");
            return Ok(None);
        }

        let mut data = PluginData::new();
        if let Some(branch) = self.current_branch() {
            data.insert(KEY_BRANCH.to_string(), Value::from(branch));
        }
        if let Some(remote) = self.remote_url() {
            data.insert(KEY_REMOTE.to_string(), Value::from(remote));
        }
        if let Some(dirty) = self.is_dirty() {
            data.insert(KEY_DIRTY.to_string(), Value::from(dirty));
        }
        if let Some(commit) = self.short_commit() {
            data.insert(KEY_COMMIT.to_string(), Value::from(commit));
        }
        let stashes = self.stash_count();
        if stashes > 0 {
            data.insert(KEY_STASH_COUNT.to_string(), Value::from(stashes));
        }

        Ok(Some(data))
    }

    fn restore(&self, data: &PluginData) -> Result<()> {
        let Some(branch) = target_branch(data) else {
            return Ok(());
        };

        if self.current_branch().as_deref() == Some(branch) {
            debug!(branch, "already on target branch");
            return Ok(());
        }

        let output = self
            .runner
            .run("git", &["checkout", branch])
            .map_err(|e| WorkshotError::Checkout {
                branch: branch.to_string(),
                output: e.to_string(),
            })?;

        if !output.success {
            return Err(WorkshotError::Checkout {
                branch: branch.to_string(),
                output: output.combined(),
            });
        }

        info!(branch, "checked out branch");
        Ok(())
    }

    fn can_restore(&self, data: &PluginData) -> bool {
        target_branch(data).is_some() && self.is_repo()
    }
}
