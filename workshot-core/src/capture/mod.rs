/*!
Capture plugins.

A [`Capturer`] gathers one category of environment state (git, shell
history, ...) and can later try to put it back. Each capturer owns one key in
[`Snapshot::plugin_data`](crate::Snapshot::plugin_data); the payload under
that key is an arbitrary JSON object only the capturer interprets.
*/

pub mod command;
pub mod git;
pub mod redact;
pub mod terminal;

use crate::Result;

/// Payload produced by one capturer, or the whole plugin bag of a snapshot
pub type PluginData = serde_json::Map<String, serde_json::Value>;

/// Contract every capture plugin implements
///
/// Capturers are registered once per process with the
/// [`CaptureManager`](crate::CaptureManager) and invoked at most once per
/// operation.
pub trait Capturer {
    /// Stable, unique key used in `plugin_data` and in error messages
    ///
    /// Changing it orphans data saved by earlier versions.
    fn name(&self) -> &str;

    /// Execution order; lower runs earlier
    fn priority(&self) -> i32;

    /// Collect state from the current environment
    ///
    /// `Ok(None)` means there was nothing worth recording and is not a
    /// failure. `Err` is reserved for attempts that broke.
    fn capture(&self) -> Result<Option<PluginData>>;

    /// Apply previously captured data back to the environment
    ///
    /// Must be idempotent: when the environment already matches `data`,
    /// nothing is mutated.
    fn restore(&self, data: &PluginData) -> Result<()>;

    /// Whether `data` can be restored right now; never has side effects
    fn can_restore(&self, data: &PluginData) -> bool;
}

pub use command::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use git::GitCapturer;
pub use terminal::TerminalCapturer;
