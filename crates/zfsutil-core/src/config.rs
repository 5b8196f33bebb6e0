//! Configuration model and helpers used by zfsutil binaries.

use crate::error::{ZfsUtilError, ZfsUtilResult};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/zfsutil.toml";
pub const DEFAULT_ZFS_PATH: &str = "/usr/bin/zfs";
pub const DEFAULT_ZPOOL_PATH: &str = "/usr/bin/zpool";
pub(crate) const KNOWN_ZFS_PATHS: &[&str] = &[
    "/usr/bin/zfs",
    "/usr/sbin/zfs",
    "/sbin/zfs",
    "/bin/zfs",
    "/usr/local/sbin/zfs",
];
pub(crate) const KNOWN_ZPOOL_PATHS: &[&str] = &[
    "/usr/bin/zpool",
    "/usr/sbin/zpool",
    "/sbin/zpool",
    "/bin/zpool",
    "/usr/local/sbin/zpool",
];

/// Return the first candidate that exists on disk.
pub fn detect_binary_path(candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .map(Path::new)
        .find(|path| path.exists())
        .map(|path| path.to_string_lossy().into_owned())
}

pub fn detect_zfs_binary_path() -> Option<String> {
    detect_binary_path(KNOWN_ZFS_PATHS)
}

pub fn detect_zpool_binary_path() -> Option<String> {
    detect_binary_path(KNOWN_ZPOOL_PATHS)
}

/// Locations of the two host binaries. Unset paths are detected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsCfg {
    #[serde(default)]
    pub zfs_path: Option<String>,

    #[serde(default)]
    pub zpool_path: Option<String>,
}

/// How a capturing run collects the child's output streams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamPolicy {
    /// stdout and stderr share one pipe and arrive interleaved.
    #[default]
    Merged,
    /// stderr is collected apart from stdout.
    Separate,
}

/// Process execution knobs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecCfg {
    /// Upper bound on a single tool run; 0 waits forever.
    #[serde(default)]
    pub timeout_secs: u64,

    #[serde(default)]
    pub streams: StreamPolicy,
}

/// Top-level configuration snapshot loaded from disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZfsUtilConfig {
    #[serde(default)]
    pub tools: ToolsCfg,

    #[serde(default)]
    pub exec: ExecCfg,

    #[serde(skip)]
    pub path: PathBuf,
}

impl ZfsUtilConfig {
    /// Read a TOML config file from disk and reject obviously broken values.
    pub fn load<P: AsRef<Path>>(path: P) -> ZfsUtilResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let mut cfg = toml::from_str::<Self>(&contents)?;
        cfg.path = path.to_path_buf();

        let issues = cfg.validate();
        if !issues.is_empty() {
            return Err(ZfsUtilError::InvalidConfig(issues.join("; ")));
        }
        Ok(cfg)
    }

    /// Like [`ZfsUtilConfig::load`], but fall back to defaults when the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> ZfsUtilResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }
        debug!("no configuration at {}; using defaults", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            ..Self::default()
        })
    }

    /// Best-effort validation pass returning human-readable issues.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if matches!(&self.tools.zfs_path, Some(path) if path.trim().is_empty()) {
            issues.push("tools.zfs_path must not be empty".to_string());
        }
        if matches!(&self.tools.zpool_path, Some(path) if path.trim().is_empty()) {
            issues.push("tools.zpool_path must not be empty".to_string());
        }
        issues
    }

    /// Bounded wait for a single tool run, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        match self.exec.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// `zfs` binary: the configured path as written, else a detected or the fixed default one.
    pub fn zfs_binary_path(&self) -> PathBuf {
        match &self.tools.zfs_path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(
                detect_zfs_binary_path().unwrap_or_else(|| DEFAULT_ZFS_PATH.to_string()),
            ),
        }
    }

    /// `zpool` binary: the configured path as written, else a detected or the fixed default one.
    pub fn zpool_binary_path(&self) -> PathBuf {
        match &self.tools.zpool_path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(
                detect_zpool_binary_path().unwrap_or_else(|| DEFAULT_ZPOOL_PATH.to_string()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_fixed_tool_locations() {
        let cfg = ZfsUtilConfig::default();
        assert_eq!(cfg.tools.zfs_path, None);
        assert_eq!(cfg.tools.zpool_path, None);
        assert_eq!(cfg.exec.streams, StreamPolicy::Merged);
        assert_eq!(cfg.timeout(), None);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn load_parses_partial_files() -> ZfsUtilResult<()> {
        let dir = tempdir()?;
        let path = dir.path().join("zfsutil.toml");
        fs::write(
            &path,
            "[tools]\nzfs_path = \"/opt/zfs/bin/zfs\"\n\n[exec]\ntimeout_secs = 30\nstreams = \"separate\"\n",
        )?;

        let cfg = ZfsUtilConfig::load(&path)?;
        assert_eq!(cfg.tools.zfs_path.as_deref(), Some("/opt/zfs/bin/zfs"));
        assert_eq!(cfg.tools.zpool_path, None);
        assert_eq!(cfg.zfs_binary_path(), PathBuf::from("/opt/zfs/bin/zfs"));
        assert_eq!(cfg.exec.streams, StreamPolicy::Separate);
        assert_eq!(cfg.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.path, path);
        Ok(())
    }

    #[test]
    fn load_rejects_empty_tool_path() -> ZfsUtilResult<()> {
        let dir = tempdir()?;
        let path = dir.path().join("zfsutil.toml");
        fs::write(&path, "[tools]\nzpool_path = \"  \"\n")?;

        match ZfsUtilConfig::load(&path) {
            Err(ZfsUtilError::InvalidConfig(message)) => {
                assert!(message.contains("tools.zpool_path"))
            }
            other => panic!("unexpected result: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn load_or_default_tolerates_missing_file() -> ZfsUtilResult<()> {
        let dir = tempdir()?;
        let path = dir.path().join("absent.toml");
        let cfg = ZfsUtilConfig::load_or_default(&path)?;
        assert_eq!(cfg.tools, ToolsCfg::default());
        assert_eq!(cfg.path, path);
        Ok(())
    }

    #[test]
    fn configured_binary_is_used_as_written_even_when_missing() -> ZfsUtilResult<()> {
        let dir = tempdir()?;
        let zfs = dir.path().join("zfs");
        let zpool = dir.path().join("zpool");
        fs::write(&zfs, "")?;
        let cfg = ZfsUtilConfig {
            tools: ToolsCfg {
                zfs_path: Some(zfs.to_string_lossy().into_owned()),
                zpool_path: Some(zpool.to_string_lossy().into_owned()),
            },
            ..ZfsUtilConfig::default()
        };
        assert_eq!(cfg.zfs_binary_path(), zfs);
        assert!(!zpool.exists());
        assert_eq!(cfg.zpool_binary_path(), zpool);
        Ok(())
    }

    #[test]
    fn unset_binary_falls_back_to_detection() {
        let cfg = ZfsUtilConfig::default();
        let expected = detect_zfs_binary_path().unwrap_or_else(|| DEFAULT_ZFS_PATH.to_string());
        assert_eq!(cfg.zfs_binary_path(), PathBuf::from(expected));
    }

    #[test]
    fn detect_binary_path_returns_first_existing() -> ZfsUtilResult<()> {
        let dir = tempdir()?;
        let second = dir.path().join("second");
        fs::write(&second, "")?;
        let missing = dir.path().join("missing");
        let candidates = [
            missing.to_str().unwrap_or_default(),
            second.to_str().unwrap_or_default(),
        ];
        assert_eq!(
            detect_binary_path(&candidates),
            Some(second.to_string_lossy().into_owned())
        );
        Ok(())
    }
}
