//! Provider contracts used by callers of `zfsutil-core`.
//!
//! The concrete implementation lives in `zfsutil-zfs`; the shared traits/types
//! are sourced from `zfsutil-provider`.

pub use zfsutil_provider::status::{LAUNCH_FAILURE_CODE, RECURSIVE_DESTROY_ABORTED};
pub use zfsutil_provider::{Captured, DatasetProvider, RecursiveDestroy, ToolKind, ToolStatus};
