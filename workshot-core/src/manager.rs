/*!
Capture registry: runs every registered capturer in priority order with
per-capturer failure isolation.
*/

use serde_json::Value;
use tracing::{debug, warn};

use crate::capture::{Capturer, GitCapturer, PluginData, TerminalCapturer};
use crate::config::WorkshotConfig;
use crate::{Result, WorkshotError};

/// Result of a capture pass that did not fail outright
#[derive(Debug, Default)]
pub struct CaptureReport {
    /// Non-empty payloads keyed by capturer name
    pub data: PluginData,
    /// Failures of individual capturers that did not stop the others
    pub errors: Vec<WorkshotError>,
}

/// Owns the capturers for one process invocation
#[derive(Default)]
pub struct CaptureManager {
    capturers: Vec<Box<dyn Capturer>>,
}

impl CaptureManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager with the built-in git and terminal capturers
    pub fn with_default_capturers(config: &WorkshotConfig) -> Self {
        let mut manager = Self::new();
        manager.register(Box::new(GitCapturer::with_timeout(config.git_timeout())));
        manager.register(Box::new(
            TerminalCapturer::new().with_max_commands(config.max_history_commands),
        ));
        manager
    }

    /// Append a capturer
    ///
    /// Names are not required to be unique, but a duplicate means the later
    /// capturer overwrites the earlier one's `plugin_data` entry.
    pub fn register(&mut self, capturer: Box<dyn Capturer>) {
        if self.capturers.iter().any(|c| c.name() == capturer.name()) {
            warn!(plugin = capturer.name(), "capturer name registered twice");
        }
        self.capturers.push(capturer);
    }

    /// Capturer names in current order
    pub fn list_capturers(&self) -> Vec<String> {
        self.capturers.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.capturers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capturers.is_empty()
    }

    /// Put capturers in execution order
    pub fn sort_by_priority(&mut self) {
        // sort_by_key is stable, so equal priorities keep registration order.
        self.capturers.sort_by_key(|c| c.priority());
    }

    /// Run every capturer, lowest priority first
    ///
    /// # Errors
    /// * `WorkshotError::AllCapturersFailed` - every registered capturer errored
    pub fn capture_all(&mut self) -> Result<CaptureReport> {
        self.sort_by_priority();

        let mut report = CaptureReport::default();
        for capturer in &self.capturers {
            let name = capturer.name();
            match capturer.capture() {
                Ok(Some(data)) if !data.is_empty() => {
                    debug!(plugin = name, keys = data.len(), "captured");
                    report.data.insert(name.to_string(), Value::Object(data));
                }
                Ok(_) => debug!(plugin = name, "nothing to capture"),
                Err(e) => {
                    warn!(plugin = name, error = %e, "capture failed");
                    report.errors.push(WorkshotError::plugin(name, e));
                }
            }
        }

        if !self.capturers.is_empty() && report.errors.len() == self.capturers.len() {
            return Err(WorkshotError::AllCapturersFailed(report.errors));
        }
        Ok(report)
    }

    /// Hand each capturer its saved payload
    ///
    /// Capturers without data, or whose `can_restore` declines, are skipped
    /// silently. Every failure is collected; none stops the remaining steps.
    pub fn restore_all(&mut self, plugin_data: &PluginData) -> Vec<WorkshotError> {
        self.sort_by_priority();

        let mut errors = Vec::new();
        for capturer in &self.capturers {
            let name = capturer.name();
            let Some(value) = plugin_data.get(name) else {
                continue;
            };

            let Some(data) = value.as_object() else {
                errors.push(WorkshotError::plugin(
                    name,
                    WorkshotError::invalid_format("expected an object"),
                ));
                continue;
            };

            if !capturer.can_restore(data) {
                debug!(plugin = name, "skipping restore");
                continue;
            }

            if let Err(e) = capturer.restore(data) {
                warn!(plugin = name, error = %e, "restore failed");
                errors.push(WorkshotError::plugin(name, e));
            }
        }
        errors
    }
}
