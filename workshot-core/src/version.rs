//! Version string reported by the CLI.

/// Placeholder reported when no real version is known
pub const DEV_VERSION: &str = "dev";

/// Version inputs fixed at compile time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    /// Release version injected by the build (`WORKSHOT_VERSION`)
    pub override_version: Option<&'static str>,
    /// Cargo package version
    pub package_version: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            override_version: option_env!("WORKSHOT_VERSION"),
            package_version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Pick the version to report
///
/// A real override beats the build's own override, which beats the package
/// version. `"dev"` and empty strings never win.
///
/// # Example
/// ```rust
/// use workshot_core::version::{resolve_version, BuildInfo};
///
/// let build = BuildInfo { override_version: None, package_version: "0.3.1" };
/// assert_eq!(resolve_version(None, &build), "0.3.1");
/// assert_eq!(resolve_version(Some("1.0.0"), &build), "1.0.0");
/// assert_eq!(resolve_version(Some("dev"), &build), "0.3.1");
/// ```
pub fn resolve_version(override_version: Option<&str>, build: &BuildInfo) -> String {
    [override_version, build.override_version, Some(build.package_version)]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|version| !version.is_empty() && *version != DEV_VERSION)
        .unwrap_or(DEV_VERSION)
        .to_string()
}
