#![forbid(unsafe_code)]

//! Contracts shared across zfsutil.
//!
//! Status types and the dataset provider trait live here so callers can drive
//! dataset workflows without depending on the concrete process plumbing.

pub mod status;
pub mod zfs;

pub use status::{
    Captured, RecursiveDestroy, ToolStatus, LAUNCH_FAILURE_CODE, RECURSIVE_DESTROY_ABORTED,
};
pub use zfs::DatasetProvider;

/// Identifies which of the two external binaries a command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Dataset management (`zfs`).
    Zfs,
    /// Pool management (`zpool`).
    Zpool,
}

impl ToolKind {
    /// Conventional `argv[0]` for the tool.
    pub fn command_name(self) -> &'static str {
        match self {
            ToolKind::Zfs => "zfs",
            ToolKind::Zpool => "zpool",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.command_name())
    }
}
