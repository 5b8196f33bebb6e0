//! zfsutil command-line interface for dataset queries and destruction.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::debug;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use zfsutil_core::config::{ZfsUtilConfig, DEFAULT_CONFIG_PATH};
use zfsutil_core::{logging, Captured, DatasetProvider, RecursiveDestroy, ToolStatus};
use zfsutil_zfs::SystemZfsProvider;

const CONFIG_ENV: &str = "ZFSUTIL_CONFIG";

/// Top-level command-line options shared by every subcommand.
#[derive(Parser, Debug)]
#[command(
    name = "zfsutil",
    version,
    about = "Query and destroy ZFS datasets through the host zfs/zpool tools."
)]
struct Cli {
    /// Path to the zfsutil configuration file.
    #[arg(short, long, env = CONFIG_ENV, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Exit 0 when the dataset exists.
    Exists { dataset: String },

    /// Exit 0 when `<dataset>@<snapshot>` exists.
    SnapshotExists { dataset: String, snapshot: String },

    /// Print the bootfs property of every pool, or of one pool.
    Bootfs { pool: Option<String> },

    /// Print `name<TAB>mountpoint` for every filesystem under a dataset.
    Mountpoints { dataset: String },

    /// Destroy exactly one dataset.
    Destroy { dataset: String },

    /// Destroy a dataset and all descendant filesystems, deepest first.
    DestroyRecursive { dataset: String },
}

fn load_cli_config(path: &Path) -> Result<ZfsUtilConfig> {
    ZfsUtilConfig::load_or_default(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

fn main() -> ExitCode {
    logging::init("warn");
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_cli_config(&cli.config)?;
    debug!("configuration loaded from {}", config.path.display());
    let provider = SystemZfsProvider::from_config(&config);

    let code = match cli.command {
        Commands::Exists { dataset } => flag(provider.exists_dataset(&dataset)),
        Commands::SnapshotExists { dataset, snapshot } => {
            flag(provider.exists_snapshot(&dataset, &snapshot))
        }
        Commands::Bootfs { pool } => print_captured(provider.boot_dataset(pool.as_deref()))?,
        Commands::Mountpoints { dataset } => {
            print_captured(provider.list_datasets_with_mountpoints(&dataset))?
        }
        Commands::Destroy { dataset } => {
            let status = provider.destroy_dataset(&dataset);
            if !status.success() {
                eprintln!("zfs destroy {dataset}: {status}");
            }
            status_code(&status)
        }
        Commands::DestroyRecursive { dataset } => {
            report_recursive(provider.destroy_recursively(&dataset))
        }
    };
    Ok(code)
}

fn flag(value: bool) -> ExitCode {
    if value {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_captured(captured: Captured) -> Result<ExitCode> {
    render_captured(&captured, &mut io::stdout().lock(), &mut io::stderr().lock())
        .context("failed to write command output")?;
    Ok(status_code(&captured.status))
}

/// Write captured text to `out`, or to `err` when it is the diagnostic of a failed run.
fn render_captured(
    captured: &Captured,
    out: &mut impl Write,
    err: &mut impl Write,
) -> io::Result<()> {
    let Some(text) = &captured.output else {
        return Ok(());
    };
    let sink: &mut dyn Write = if captured.status.success() { out } else { err };
    sink.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        sink.write_all(b"\n")?;
    }
    Ok(())
}

fn report_recursive(outcome: RecursiveDestroy) -> ExitCode {
    match &outcome {
        RecursiveDestroy::Completed { destroyed } => {
            for dataset in destroyed {
                println!("destroyed {dataset}");
            }
        }
        RecursiveDestroy::Aborted {
            failed,
            status,
            destroyed,
        } => {
            for dataset in destroyed {
                println!("destroyed {dataset}");
            }
            eprintln!("stopped at {failed} ({status}); remaining datasets were left in place");
        }
        RecursiveDestroy::ListingFailed { status, diagnostic } => {
            eprintln!("listing failed ({status}): {diagnostic}");
        }
    }
    exit_code(outcome.code())
}

fn status_code(status: &ToolStatus) -> ExitCode {
    exit_code(status.code())
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(clamp_code(code))
}

/// Map an operation code onto a process exit code, keeping failures nonzero.
fn clamp_code(code: i32) -> u8 {
    match u8::try_from(code) {
        Ok(value) => value,
        Err(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_destroy_recursive() {
        let cli = Cli::try_parse_from([
            "zfsutil",
            "-c",
            "/tmp/z.toml",
            "destroy-recursive",
            "tank/a",
        ])
        .expect("parse");
        assert_eq!(cli.config, PathBuf::from("/tmp/z.toml"));
        assert!(matches!(
            cli.command,
            Commands::DestroyRecursive { ref dataset } if dataset == "tank/a"
        ));
    }

    #[test]
    fn bootfs_pool_is_optional() {
        let cli = Cli::try_parse_from(["zfsutil", "bootfs"]).expect("parse");
        assert!(matches!(cli.command, Commands::Bootfs { pool: None }));
    }

    #[test]
    fn captured_text_goes_to_stdout_on_success() {
        let captured = Captured {
            output: Some("rpool/ROOT/default".into()),
            status: ToolStatus::from_code(0),
        };
        let (mut out, mut err) = (Vec::new(), Vec::new());
        render_captured(&captured, &mut out, &mut err).expect("render");
        assert_eq!(out, b"rpool/ROOT/default\n");
        assert!(err.is_empty());
    }

    #[test]
    fn failure_diagnostics_go_to_stderr() {
        let captured = Captured {
            output: Some("cannot open 'nopool': no such pool\n".into()),
            status: ToolStatus::from_code(1),
        };
        let (mut out, mut err) = (Vec::new(), Vec::new());
        render_captured(&captured, &mut out, &mut err).expect("render");
        assert!(out.is_empty());
        assert_eq!(err, b"cannot open 'nopool': no such pool\n");
    }

    #[test]
    fn nothing_is_written_without_output() {
        let captured = Captured {
            output: None,
            status: ToolStatus::from_code(1),
        };
        let (mut out, mut err) = (Vec::new(), Vec::new());
        render_captured(&captured, &mut out, &mut err).expect("render");
        assert!(out.is_empty() && err.is_empty());
    }

    #[test]
    fn exit_codes_stay_nonzero_for_failures() {
        assert_eq!(clamp_code(0), 0);
        assert_eq!(clamp_code(3), 3);
        assert_eq!(clamp_code(254), 254);
        assert_eq!(clamp_code(-2), 1);
        assert_eq!(clamp_code(-1), 1);
        assert_eq!(clamp_code(4096), 1);
    }
}
