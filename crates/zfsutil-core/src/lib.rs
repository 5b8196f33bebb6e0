//! Core building blocks shared by zfsutil crates.
//!
//! Configuration, errors, logging, and dataset naming helpers live here so the
//! process and provider crates can focus on running the host tools.

pub mod config;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod provider;

pub use config::{ExecCfg, StreamPolicy, ToolsCfg, ZfsUtilConfig};
pub use dataset::{snapshot_reference, split_lines};
pub use error::{ZfsUtilError, ZfsUtilResult};
pub use provider::{Captured, DatasetProvider, RecursiveDestroy, ToolKind, ToolStatus};
