//! Recent shell history capturer.

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, warn};

use super::redact::is_sensitive;
use super::{Capturer, PluginData};
use crate::config::DEFAULT_MAX_HISTORY_COMMANDS;
use crate::{Result, WorkshotError};

pub const PLUGIN_NAME: &str = "terminal";
pub const PRIORITY: i32 = 30;

pub const KEY_RECENT_COMMANDS: &str = "recent_commands";

/// Well-known history files, most specific shell first
const HISTORY_FILE_NAMES: &[&str] = &[".zsh_history", ".bash_history", ".history"];

/// Records the last few commands from the user's shell history.
///
/// The data is informational only and is never re-applied.
#[derive(Debug, Clone)]
pub struct TerminalCapturer {
    history_files: Vec<PathBuf>,
    max_commands: usize,
}

impl TerminalCapturer {
    /// Capturer reading the current user's shell history
    ///
    /// `$HISTFILE` is tried first when set, then the usual per-shell files in
    /// the home directory.
    pub fn new() -> Self {
        Self::with_history_files(history_candidates(
            std::env::var_os("HISTFILE"),
            dirs::home_dir(),
        ))
    }

    /// Capturer reading an explicit, ordered list of candidate files
    pub fn with_history_files(history_files: Vec<PathBuf>) -> Self {
        Self {
            history_files,
            max_commands: DEFAULT_MAX_HISTORY_COMMANDS,
        }
    }

    pub fn with_max_commands(mut self, max_commands: usize) -> Self {
        self.max_commands = max_commands;
        self
    }

    pub fn history_files(&self) -> &[PathBuf] {
        &self.history_files
    }

    /// Commands from the first candidate that yields any
    ///
    /// Files are never merged. A read failure only surfaces when no other
    /// candidate produced commands.
    fn recent_commands(&self) -> Result<Vec<String>> {
        let mut read_error = None;

        for path in &self.history_files {
            let bytes = match fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot read history file");
                    if read_error.is_none() {
                        read_error = Some(WorkshotError::storage(format!(
                            "failed to read history file {}: {}",
                            path.display(),
                            e
                        )));
                    }
                    continue;
                }
            };

            let commands = self.parse_history(&String::from_utf8_lossy(&bytes));
            if !commands.is_empty() {
                debug!(path = %path.display(), count = commands.len(), "read shell history");
                return Ok(commands);
            }
        }

        match read_error {
            Some(error) => Err(error),
            None => Ok(Vec::new()),
        }
    }

    /// Keep the last `max_commands` clean, non-sensitive lines
    fn parse_history(&self, contents: &str) -> Vec<String> {
        let mut lines: Vec<String> = contents
            .lines()
            .filter_map(clean_history_line)
            .filter(|line| !is_sensitive(line))
            .collect();

        let excess = lines.len().saturating_sub(self.max_commands);
        lines.drain(..excess);
        lines
    }
}

/// Ordered history files to try: a non-empty `$HISTFILE`, then the
/// well-known files under `home`
fn history_candidates(histfile: Option<OsString>, home: Option<PathBuf>) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = histfile
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .into_iter()
        .collect();
    if let Some(home) = home {
        candidates.extend(HISTORY_FILE_NAMES.iter().map(|name| home.join(name)));
    }
    candidates
}

impl Default for TerminalCapturer {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip shell metadata from a history line
///
/// zsh extended history looks like `: 1640000000:0;git status`; only the text
/// after the first `;` is the command. Bash `HISTTIMEFORMAT` stamp lines
/// (`#1640000000`) and blank lines yield `None`.
pub fn clean_history_line(line: &str) -> Option<String> {
    let mut line = line;
    if line.starts_with(':') {
        if let Some((_, command)) = line.split_once(';') {
            line = command;
        }
    }

    let line = line.trim();
    let is_bash_timestamp = line
        .strip_prefix('#')
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()));

    if line.is_empty() || is_bash_timestamp {
        None
    } else {
        Some(line.to_string())
    }
}

impl Capturer for TerminalCapturer {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn capture(&self) -> Result<Option<PluginData>> {
        let commands = self.recent_commands()?;
        if commands.is_empty() {
            return Ok(None);
        }

        let mut data = PluginData::new();
        data.insert(KEY_RECENT_COMMANDS.to_string(), Value::from(commands));
        Ok(Some(data))
    }

    fn restore(&self, _data: &PluginData) -> Result<()> {
        Ok(())
    }

    fn can_restore(&self, _data: &PluginData) -> bool {
        false
    }
}
