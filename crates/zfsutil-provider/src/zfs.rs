//! Provider contract for dataset queries and destruction.
//!
//! Every operation recovers failures at its own boundary and reports them as a
//! status, leaving the decision about fatality to the caller.

use crate::status::{Captured, RecursiveDestroy, ToolStatus};

/// Abstraction over the dataset workflows built on the `zfs`/`zpool` CLIs.
pub trait DatasetProvider {
    /// Return true iff `zfs get -H type <name>` exits zero.
    ///
    /// A missing dataset, a permission error and a missing binary all report `false`.
    fn exists_dataset(&self, name: &str) -> bool;

    /// Return true iff `<dataset>@<snapshot>` exists.
    fn exists_snapshot(&self, dataset: &str, snapshot: &str) -> bool;

    /// Raw status of the type lookup, for callers that need to tell failures apart.
    fn dataset_type_status(&self, name: &str) -> ToolStatus;

    /// Query the `bootfs` property, of every pool or only `pool`.
    fn boot_dataset(&self, pool: Option<&str>) -> Captured;

    /// List filesystems under `dataset` as raw `name<TAB>mountpoint` lines.
    fn list_datasets_with_mountpoints(&self, dataset: &str) -> Captured;

    /// Destroy exactly one dataset.
    fn destroy_dataset(&self, name: &str) -> ToolStatus;

    /// Destroy `root` and every descendant filesystem, deepest first, stopping on the first failure.
    fn destroy_recursively(&self, root: &str) -> RecursiveDestroy;
}
