//! Handles spawning the `zfs` and `zpool` binaries and collecting what they
//! report. This is the only place that touches child processes.

use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::io::{self, PipeReader, Read};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use zfsutil_core::config::{StreamPolicy, ZfsUtilConfig};
use zfsutil_core::error::{ZfsUtilError, ZfsUtilResult};
use zfsutil_core::ToolStatus;

/// Size of a single read from the capture pipe.
pub(crate) const READ_CHUNK: usize = 16;

const POLL_INTERVAL: Duration = Duration::from_millis(25);
const TERM_GRACE: Duration = Duration::from_millis(200);

/// Spawns one child per call and blocks until it has exited.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
    streams: StreamPolicy,
}

/// What a finished child left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Captured stdout (and stderr when merged). `None` until a byte was read.
    pub output: Option<Vec<u8>>,
    /// Captured stderr, only populated under [`StreamPolicy::Separate`].
    pub diagnostics: Option<Vec<u8>>,
    pub status: ToolStatus,
}

impl Execution {
    fn launch_failed(reason: String) -> Self {
        Self {
            output: None,
            diagnostics: None,
            status: ToolStatus::LaunchFailed { reason },
        }
    }
}

impl ProcessRunner {
    pub fn new(timeout: Option<Duration>, streams: StreamPolicy) -> Self {
        Self { timeout, streams }
    }

    pub fn from_config(config: &ZfsUtilConfig) -> Self {
        Self::new(config.timeout(), config.exec.streams)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run `program` with `argv` (where `argv[0]` becomes the child's `argv[0]`).
    ///
    /// With `capture` unset both output streams are discarded. A binary that cannot
    /// be executed yields [`ToolStatus::LaunchFailed`]; `Err` is reserved for cases
    /// where no status exists at all.
    pub fn run(&self, program: &Path, capture: bool, argv: &[&str]) -> ZfsUtilResult<Execution> {
        debug!("exec {} {:?}", program.display(), argv);

        let spawned = {
            let mut command = Command::new(program);
            if let Some((arg0, args)) = argv.split_first() {
                command.arg0(arg0);
                command.args(args);
            }
            command.stdin(Stdio::null());
            if self.timeout.is_some() {
                command.process_group(0);
            }

            let pipes = if capture {
                Some(self.attach_pipes(&mut command)?)
            } else {
                command.stdout(Stdio::null());
                command.stderr(Stdio::null());
                None
            };

            // `command` holds the parent's write ends; it is dropped at the end of
            // this block so the readers see end-of-stream once the child exits.
            command.spawn().map(|child| (child, pipes))
        };

        let (mut child, pipes) = match spawned {
            Ok(spawned) => spawned,
            Err(err) if is_launch_failure(&err) => {
                warn!("unable to execute {}: {err}", program.display());
                return Ok(Execution::launch_failed(err.to_string()));
            }
            Err(err) => {
                return Err(ZfsUtilError::Fork {
                    binary: program.display().to_string(),
                    reason: err.to_string(),
                })
            }
        };

        let (stdout_pipe, stderr_pipe) = pipes.unwrap_or((None, None));
        let readers = [
            stdout_pipe.map(spawn_output_reader),
            stderr_pipe.map(spawn_output_reader),
        ];

        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let status = match deadline {
            None => Some(child.wait()?),
            Some(deadline) => wait_until(&mut child, deadline)?,
        };

        // One deadline covers both the child and anything it left holding the pipe.
        let status = match (status, deadline) {
            (Some(status), None) => status,
            (Some(status), Some(deadline)) if readers_done_by(&readers, deadline) => status,
            _ => {
                terminate_group(&mut child);
                let [stdout_handle, stderr_handle] = readers;
                abandon_reader(stdout_handle, "stdout");
                abandon_reader(stderr_handle, "stderr");
                return Err(ZfsUtilError::Timeout {
                    binary: program.display().to_string(),
                    after: self.timeout.unwrap_or_default(),
                });
            }
        };

        let [stdout_handle, stderr_handle] = readers;
        let output = join_reader(stdout_handle, "stdout")?;
        let diagnostics = join_reader(stderr_handle, "stderr")?;

        Ok(Execution {
            output,
            diagnostics,
            status: ToolStatus::from(status),
        })
    }

    fn attach_pipes(
        &self,
        command: &mut Command,
    ) -> io::Result<(Option<PipeReader>, Option<PipeReader>)> {
        match self.streams {
            StreamPolicy::Merged => {
                let (reader, writer) = io::pipe()?;
                command.stdout(writer.try_clone()?);
                command.stderr(writer);
                Ok((Some(reader), None))
            }
            StreamPolicy::Separate => {
                let (out_reader, out_writer) = io::pipe()?;
                let (err_reader, err_writer) = io::pipe()?;
                command.stdout(out_writer);
                command.stderr(err_writer);
                Ok((Some(out_reader), Some(err_reader)))
            }
        }
    }
}

/// Poll the child until it exits or `deadline` passes. `None` means it is still running.
fn wait_until(child: &mut Child, deadline: Instant) -> ZfsUtilResult<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn readers_done_by(readers: &[Option<Reader>], deadline: Instant) -> bool {
    loop {
        if readers.iter().flatten().all(|handle| handle.is_finished()) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// SIGTERM then SIGKILL to the child's process group, and always reap the child.
///
/// Bounded runs place the child in its own group, so this also reaches
/// grandchildren that still hold the capture pipe.
fn terminate_group(child: &mut Child) {
    if let Ok(pid) = i32::try_from(child.id()) {
        let group = Pid::from_raw(pid);
        if killpg(group, Signal::SIGTERM).is_ok() {
            thread::sleep(TERM_GRACE);
            let _ = killpg(group, Signal::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

/// Join a reader after its group was killed; give up only if the pipe is still held.
fn abandon_reader(handle: Option<Reader>, stream: &'static str) {
    let Some(handle) = handle else {
        return;
    };
    let deadline = Instant::now() + TERM_GRACE;
    while !handle.is_finished() && Instant::now() < deadline {
        thread::sleep(POLL_INTERVAL);
    }
    if handle.is_finished() {
        let _ = handle.join();
    } else {
        warn!("{stream} pipe still held by a process outside the killed group");
    }
}

/// Errors the OS reports when the image replacement itself fails.
fn is_launch_failure(err: &io::Error) -> bool {
    let Some(code) = err.raw_os_error() else {
        return false;
    };
    matches!(
        Errno::from_raw(code),
        Errno::ENOENT
            | Errno::EACCES
            | Errno::ENOEXEC
            | Errno::ENOTDIR
            | Errno::ELOOP
            | Errno::E2BIG
            | Errno::ETXTBSY
            | Errno::ENAMETOOLONG
            | Errno::EPERM
    )
}

type Reader = thread::JoinHandle<io::Result<Option<Vec<u8>>>>;

fn spawn_output_reader(pipe: PipeReader) -> Reader {
    thread::spawn(move || read_captured(pipe))
}

fn join_reader(handle: Option<Reader>, stream: &'static str) -> ZfsUtilResult<Option<Vec<u8>>> {
    match handle {
        Some(handle) => Ok(handle
            .join()
            .map_err(|_| ZfsUtilError::ReaderPanicked(stream))??),
        None => Ok(None),
    }
}

/// Drain `reader` to end-of-stream. Stays `None` until the first non-empty read.
pub(crate) fn read_captured<R: Read>(mut reader: R) -> io::Result<Option<Vec<u8>>> {
    let mut chunk = [0u8; READ_CHUNK];
    let mut captured: Option<Vec<u8>> = None;
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => return Ok(captured),
            Ok(n) => captured
                .get_or_insert_with(Vec::new)
                .extend_from_slice(&chunk[..n]),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out at most `step` bytes per read and interrupts every other call.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
        interrupt: bool,
    }

    impl Trickle {
        fn new(data: &[u8], step: usize) -> Self {
            Self {
                data: data.to_vec(),
                pos: 0,
                step,
                interrupt: false,
            }
        }
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            let end = (self.pos + self.step.min(buf.len())).min(self.data.len());
            let n = end - self.pos;
            buf[..n].copy_from_slice(&self.data[self.pos..end]);
            self.pos = end;
            Ok(n)
        }
    }

    #[test]
    fn empty_stream_stays_absent() {
        let captured = read_captured(io::empty()).expect("read");
        assert_eq!(captured, None);
    }

    #[test]
    fn chunking_does_not_change_reconstructed_output() {
        let payload: Vec<u8> = (0..200u8)
            .map(|i| if i % 17 == 0 { b'\n' } else { b'a' + i % 26 })
            .collect();
        for step in [1, READ_CHUNK, READ_CHUNK * 5 + 3] {
            let captured = read_captured(Trickle::new(&payload, step)).expect("read");
            assert_eq!(captured.as_deref(), Some(payload.as_slice()), "step {step}");
        }
    }

    #[test]
    fn read_errors_propagate() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::from(io::ErrorKind::BrokenPipe))
            }
        }
        let err = read_captured(Broken).expect_err("should fail");
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn exec_stage_errnos_are_launch_failures() {
        assert!(is_launch_failure(&io::Error::from_raw_os_error(
            Errno::ENOENT as i32
        )));
        assert!(is_launch_failure(&io::Error::from_raw_os_error(
            Errno::ENOEXEC as i32
        )));
        assert!(!is_launch_failure(&io::Error::from_raw_os_error(
            Errno::EAGAIN as i32
        )));
        assert!(!is_launch_failure(&io::Error::from(io::ErrorKind::Other)));
    }
}
