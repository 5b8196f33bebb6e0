//! System-backed `DatasetProvider` implementation.
//!
//! Every operation builds an argument vector, hands it to the [`ToolRunner`],
//! and interprets the status on the way back. Runner errors never escape: they
//! become [`ToolStatus::Unavailable`].

use crate::command::Execution;
use crate::parse;
use crate::tools::{ToolRunner, ZfsTools};
use log::{debug, error, info, warn};
use zfsutil_core::config::ZfsUtilConfig;
use zfsutil_core::dataset::{snapshot_reference, split_lines};
use zfsutil_core::{Captured, DatasetProvider, RecursiveDestroy, ToolKind, ToolStatus};

const ZFS: &str = "zfs";
const ZPOOL: &str = "zpool";

/// Provider that manages datasets via the host `zfs` and `zpool` binaries.
#[derive(Debug, Clone, Default)]
pub struct SystemZfsProvider<R = ZfsTools> {
    tools: R,
}

impl SystemZfsProvider<ZfsTools> {
    /// Build a provider from configuration, resolving binary paths and exec policy.
    pub fn from_config(config: &ZfsUtilConfig) -> Self {
        Self::with_runner(ZfsTools::from_config(config))
    }
}

impl<R: ToolRunner> SystemZfsProvider<R> {
    pub fn with_runner(tools: R) -> Self {
        Self { tools }
    }

    fn execute(&self, tool: ToolKind, capture: bool, argv: &[&str]) -> Execution {
        match self.tools.run(tool, capture, argv) {
            Ok(execution) => execution,
            Err(err) => {
                warn!("{tool} {argv:?} could not be run: {err}");
                Execution {
                    output: None,
                    diagnostics: None,
                    status: ToolStatus::Unavailable {
                        reason: err.to_string(),
                    },
                }
            }
        }
    }

    fn query(&self, tool: ToolKind, argv: &[&str]) -> Captured {
        let execution = self.execute(tool, true, argv);
        if !execution.status.success() {
            warn!("{} returned {}", argv.join(" "), execution.status);
        }
        Captured {
            output: parse::decode(execution.output.as_deref()),
            status: execution.status,
        }
    }
}

impl<R: ToolRunner> DatasetProvider for SystemZfsProvider<R> {
    fn exists_dataset(&self, name: &str) -> bool {
        self.dataset_type_status(name).success()
    }

    fn exists_snapshot(&self, dataset: &str, snapshot: &str) -> bool {
        self.exists_dataset(&snapshot_reference(dataset, snapshot))
    }

    fn dataset_type_status(&self, name: &str) -> ToolStatus {
        let status = self
            .execute(ToolKind::Zfs, false, &[ZFS, "get", "-H", "type", name])
            .status;
        debug!("type lookup for {name}: {status}");
        status
    }

    fn boot_dataset(&self, pool: Option<&str>) -> Captured {
        let mut argv = vec![ZPOOL, "list", "-Ho", "bootfs"];
        argv.extend(pool);
        let mut captured = self.query(ToolKind::Zpool, &argv);
        captured.output = captured.output.map(parse::single_line);
        captured
    }

    fn list_datasets_with_mountpoints(&self, dataset: &str) -> Captured {
        self.query(
            ToolKind::Zfs,
            &[ZFS, "list", "-r", dataset, "-t", "filesystem", "-Ho", "name,mountpoint"],
        )
    }

    fn destroy_dataset(&self, name: &str) -> ToolStatus {
        let status = self
            .execute(ToolKind::Zfs, false, &[ZFS, "destroy", name])
            .status;
        if !status.success() {
            warn!("zfs destroy {name} returned {status}");
        }
        status
    }

    fn destroy_recursively(&self, root: &str) -> RecursiveDestroy {
        // Descending name order lists children before their parents.
        let listing = self.execute(
            ToolKind::Zfs,
            true,
            &[ZFS, "list", "-tfilesystem", "-Hro", "name", "-Sname", root],
        );

        if listing.status.never_ran() {
            let diagnostic = listing.status.to_string();
            warn!("unable to list datasets under {root}: {diagnostic}");
            return RecursiveDestroy::ListingFailed {
                status: listing.status,
                diagnostic,
            };
        }

        if !listing.status.success() {
            let diagnostic = parse::diagnostic(&listing);
            if diagnostic.is_empty() || parse::reports_missing_dataset(&diagnostic) {
                debug!("nothing to destroy under {root}");
                return RecursiveDestroy::Completed {
                    destroyed: Vec::new(),
                };
            }
            warn!(
                "zfs list under {root} returned {}: {diagnostic}",
                listing.status
            );
            return RecursiveDestroy::ListingFailed {
                status: listing.status,
                diagnostic,
            };
        }

        let text = match parse::decode_exact(listing.output) {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!("nothing to destroy under {root}");
                return RecursiveDestroy::Completed {
                    destroyed: Vec::new(),
                };
            }
            Err(err) => {
                let diagnostic = format!("dataset listing is not valid UTF-8: {err}");
                warn!("unable to list datasets under {root}: {diagnostic}");
                return RecursiveDestroy::ListingFailed {
                    status: ToolStatus::Unavailable {
                        reason: diagnostic.clone(),
                    },
                    diagnostic,
                };
            }
        };

        let mut destroyed = Vec::new();
        for dataset in split_lines(&text) {
            let status = self.destroy_dataset(&dataset);
            if !status.success() {
                error!(
                    "not destroying any more datasets under {root}: {dataset} failed with {status}"
                );
                return RecursiveDestroy::Aborted {
                    failed: dataset,
                    status,
                    destroyed,
                };
            }
            destroyed.push(dataset);
        }

        info!("destroyed {} datasets under {root}", destroyed.len());
        RecursiveDestroy::Completed { destroyed }
    }
}
