//! Termination status of external tool invocations and the results built on it.

use std::fmt;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

/// Numeric code reported when the tool binary could not be executed at all.
pub const LAUNCH_FAILURE_CODE: i32 = 254;

/// Numeric code reported when a recursive destroy stopped partway through.
pub const RECURSIVE_DESTROY_ABORTED: i32 = -2;

const UNAVAILABLE_CODE: i32 = -1;

/// Outcome of a single external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolStatus {
    /// The tool ran and terminated; `raw` is the wait status as reported by the OS.
    Exited { raw: i32 },
    /// The tool binary could not replace the child image (missing, not executable, ...).
    LaunchFailed { reason: String },
    /// No usable result: no child could be created or supervised (fork failure, pipe I/O,
    /// timeout), or its output could not be used as-is.
    Unavailable { reason: String },
}

impl ToolStatus {
    /// Status of a tool that exited normally with `code`.
    pub fn from_code(code: i32) -> Self {
        ToolStatus::Exited {
            raw: (code & 0xff) << 8,
        }
    }

    /// Zero raw status means success; everything else is a failure.
    pub fn success(&self) -> bool {
        matches!(self, ToolStatus::Exited { raw: 0 })
    }

    /// Raw wait status, preserved for diagnostics.
    pub fn raw(&self) -> i32 {
        match self {
            ToolStatus::Exited { raw } => *raw,
            ToolStatus::LaunchFailed { .. } => LAUNCH_FAILURE_CODE << 8,
            ToolStatus::Unavailable { .. } => UNAVAILABLE_CODE,
        }
    }

    /// Exit-code style number: the tool's exit code, 128+signal, 254 or -1.
    pub fn code(&self) -> i32 {
        match self {
            ToolStatus::Exited { raw } => {
                let status = ExitStatus::from_raw(*raw);
                match (status.code(), status.signal()) {
                    (Some(code), _) => code,
                    (None, Some(signal)) => 128 + signal,
                    (None, None) => *raw,
                }
            }
            ToolStatus::LaunchFailed { .. } => LAUNCH_FAILURE_CODE,
            ToolStatus::Unavailable { .. } => UNAVAILABLE_CODE,
        }
    }

    /// True when the binary never ran (launch failure or unavailable runner).
    pub fn never_ran(&self) -> bool {
        !matches!(self, ToolStatus::Exited { .. })
    }
}

impl From<ExitStatus> for ToolStatus {
    fn from(status: ExitStatus) -> Self {
        ToolStatus::Exited {
            raw: status.into_raw(),
        }
    }
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolStatus::Exited { raw } => {
                let status = ExitStatus::from_raw(*raw);
                match (status.code(), status.signal()) {
                    (Some(code), _) => write!(f, "exit code {code}"),
                    (None, Some(signal)) => write!(f, "terminated by signal {signal}"),
                    (None, None) => write!(f, "raw status {raw}"),
                }
            }
            ToolStatus::LaunchFailed { reason } => {
                write!(f, "could not launch (status {LAUNCH_FAILURE_CODE}): {reason}")
            }
            ToolStatus::Unavailable { reason } => write!(f, "unavailable: {reason}"),
        }
    }
}

/// Captured text plus status of a capturing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    /// `None` when the tool wrote nothing at all.
    pub output: Option<String>,
    pub status: ToolStatus,
}

impl Captured {
    /// Output is only trustworthy when the status reports success.
    pub fn value(&self) -> Option<&str> {
        if self.status.success() {
            self.output.as_deref()
        } else {
            None
        }
    }
}

/// Result of destroying a dataset together with all descendant filesystems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecursiveDestroy {
    /// Every listed dataset was destroyed, deepest first. Empty when there was nothing to do.
    Completed { destroyed: Vec<String> },
    /// A destroy failed; later datasets were left alone. Earlier ones stay destroyed.
    Aborted {
        failed: String,
        status: ToolStatus,
        destroyed: Vec<String>,
    },
    /// The descendant listing itself failed, nothing was destroyed.
    ListingFailed { status: ToolStatus, diagnostic: String },
}

impl RecursiveDestroy {
    pub fn success(&self) -> bool {
        matches!(self, RecursiveDestroy::Completed { .. })
    }

    /// 0 on success, [`RECURSIVE_DESTROY_ABORTED`] after a partial run, otherwise the listing status.
    pub fn code(&self) -> i32 {
        match self {
            RecursiveDestroy::Completed { .. } => 0,
            RecursiveDestroy::Aborted { .. } => RECURSIVE_DESTROY_ABORTED,
            RecursiveDestroy::ListingFailed { status, .. } => status.code(),
        }
    }

    pub fn destroyed(&self) -> &[String] {
        match self {
            RecursiveDestroy::Completed { destroyed } => destroyed,
            RecursiveDestroy::Aborted { destroyed, .. } => destroyed,
            RecursiveDestroy::ListingFailed { .. } => &[],
        }
    }
}
