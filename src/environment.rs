//! One-shot host environment probe feeding flow selection.

use std::path::PathBuf;

use crate::config::AuthRequest;

/// Operating system family, as far as flow eligibility cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    MacOs,
    Linux,
    Other,
}

impl OsFamily {
    /// Family of the running host.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::Other
        }
    }
}

/// Read-once facts about the host, captured before flow selection.
///
/// Probes never fail: anything unreadable degrades to `None`/`false` and
/// simply makes the corresponding flow ineligible.
#[derive(Debug, Clone)]
pub struct EnvironmentSnapshot {
    pub os: OsFamily,
    pub os_major_version: Option<u32>,
    /// Present only when the configured WebView2 runtime directory exists.
    pub webview2_runtime: Option<PathBuf>,
    /// True only on builds carrying the legacy embedded browser, on Windows.
    pub legacy_webview: bool,
}

impl EnvironmentSnapshot {
    /// Probe the running host for the given request.
    pub fn probe(request: &AuthRequest) -> Self {
        let os = OsFamily::current();
        let webview2_runtime = match (&request.webview2_runtime_dir, os) {
            (Some(dir), OsFamily::Windows) if dir.is_dir() => Some(dir.clone()),
            _ => None,
        };
        Self {
            os,
            os_major_version: probe_major_version(os),
            webview2_runtime,
            legacy_webview: cfg!(feature = "legacy-webview") && os == OsFamily::Windows,
        }
    }

    /// Snapshot for a host with nothing interesting on it. Test seam.
    pub fn bare(os: OsFamily) -> Self {
        Self {
            os,
            os_major_version: None,
            webview2_runtime: None,
            legacy_webview: false,
        }
    }

    pub fn with_os_major_version(mut self, version: u32) -> Self {
        self.os_major_version = Some(version);
        self
    }

    pub fn with_webview2_runtime(mut self, dir: impl Into<PathBuf>) -> Self {
        self.webview2_runtime = Some(dir.into());
        self
    }

    pub fn with_legacy_webview(mut self, present: bool) -> Self {
        self.legacy_webview = present;
        self
    }
}

/// Best-effort OS major version. Windows builds must ship a manifest for the
/// reported version to be trustworthy; elsewhere this reads the kernel
/// release string.
fn probe_major_version(os: OsFamily) -> Option<u32> {
    match os {
        #[cfg(windows)]
        OsFamily::Windows => {
            use std::process::Command;
            let output = Command::new("cmd").args(["/C", "ver"]).output().ok()?;
            parse_major_version(&String::from_utf8_lossy(&output.stdout))
        }
        #[cfg(unix)]
        OsFamily::Linux | OsFamily::MacOs => {
            use std::process::Command;
            let output = Command::new("uname").arg("-r").output().ok()?;
            parse_major_version(&String::from_utf8_lossy(&output.stdout))
        }
        _ => None,
    }
}

/// Pull the first run of digits out of a version string.
fn parse_major_version(raw: &str) -> Option<u32> {
    let digits: String = raw
        .chars()
        .skip_while(|ch| !ch.is_ascii_digit())
        .take_while(|ch| ch.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
