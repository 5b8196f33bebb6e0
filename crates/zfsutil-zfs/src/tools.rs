//! Binds the process runner to the two fixed host binaries.

use crate::command::{Execution, ProcessRunner};
use std::path::{Path, PathBuf};
use zfsutil_core::config::{ZfsUtilConfig, DEFAULT_ZFS_PATH, DEFAULT_ZPOOL_PATH};
use zfsutil_core::error::ZfsUtilResult;
use zfsutil_core::ToolKind;

/// Seam between dataset workflows and process execution.
pub trait ToolRunner {
    /// Run `tool` with `argv`, capturing its output when `capture` is set.
    ///
    /// By convention `argv[0]` is [`ToolKind::command_name`].
    fn run(&self, tool: ToolKind, capture: bool, argv: &[&str]) -> ZfsUtilResult<Execution>;
}

/// `zfs` and `zpool` locations plus the runner used to invoke them.
#[derive(Debug, Clone)]
pub struct ZfsTools {
    runner: ProcessRunner,
    zfs: PathBuf,
    zpool: PathBuf,
}

impl Default for ZfsTools {
    fn default() -> Self {
        Self::new(
            ProcessRunner::default(),
            PathBuf::from(DEFAULT_ZFS_PATH),
            PathBuf::from(DEFAULT_ZPOOL_PATH),
        )
    }
}

impl ZfsTools {
    pub fn new(runner: ProcessRunner, zfs: PathBuf, zpool: PathBuf) -> Self {
        Self { runner, zfs, zpool }
    }

    pub fn from_config(config: &ZfsUtilConfig) -> Self {
        Self::new(
            ProcessRunner::from_config(config),
            config.zfs_binary_path(),
            config.zpool_binary_path(),
        )
    }

    /// Path of the binary backing `tool`.
    pub fn binary(&self, tool: ToolKind) -> &Path {
        match tool {
            ToolKind::Zfs => &self.zfs,
            ToolKind::Zpool => &self.zpool,
        }
    }

    pub fn runner(&self) -> &ProcessRunner {
        &self.runner
    }

    pub fn run_zfs(&self, capture: bool, argv: &[&str]) -> ZfsUtilResult<Execution> {
        self.runner.run(&self.zfs, capture, argv)
    }

    pub fn run_zpool(&self, capture: bool, argv: &[&str]) -> ZfsUtilResult<Execution> {
        self.runner.run(&self.zpool, capture, argv)
    }
}

impl ToolRunner for ZfsTools {
    fn run(&self, tool: ToolKind, capture: bool, argv: &[&str]) -> ZfsUtilResult<Execution> {
        match tool {
            ToolKind::Zfs => self.run_zfs(capture, argv),
            ToolKind::Zpool => self.run_zpool(capture, argv),
        }
    }
}
