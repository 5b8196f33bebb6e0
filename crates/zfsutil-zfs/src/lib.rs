#![forbid(unsafe_code)]

//! ZFS integration.
//!
//! `system` implements `DatasetProvider` on top of the host `zfs`/`zpool` CLIs.
//! `command` and `tools` isolate process execution and `parse` isolates output
//! handling so the provider stays testable.

mod command;
mod parse;
mod system;
mod tools;

pub use command::{Execution, ProcessRunner};
pub use system::SystemZfsProvider;
pub use tools::{ToolRunner, ZfsTools};
