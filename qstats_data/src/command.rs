use std::{
    io::Read,
    process::{Command, ExitStatus, Stdio},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use itertools::Itertools as _;
use log::{debug, warn};

use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// `program arg1 arg2 ...`, for log and error messages
pub fn describe(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|part| part.to_string_lossy())
        .join(" ")
}

/// Run `command` to completion and hand back stdout/stderr as text.
///
/// Stderr output and a non-zero exit status are only logged, the caller gets whatever the command
/// printed and decides whether that's usable. The child is killed once `timeout` has passed.
pub fn run_command(command: &mut Command, timeout: Duration) -> Result<CommandOutput> {
    let description = describe(command);
    debug!("Running `{description}`");

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| Error::Spawn {
            command: description.clone(),
            source,
        })?;

    // drain both pipes concurrently, a full pipe would block the child forever
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                // errors here just mean the child is already gone
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::Timeout {
                    command: description,
                    timeout,
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => {
                return Err(Error::Spawn {
                    command: description,
                    source,
                })
            }
        }
    };

    let output = CommandOutput {
        status,
        stdout: collect(stdout, &description),
        stderr: collect(stderr, &description),
    };
    if !output.stderr.trim().is_empty() {
        warn!("`{description}` wrote to stderr: {}", output.stderr.trim());
    }
    if !status.success() {
        warn!("`{description}` exited with {status}");
    }
    Ok(output)
}

/// Read `pipe` to the end on its own thread. A failing read keeps what arrived before it.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            if let Err(error) = pipe.read_to_end(&mut buf) {
                warn!("Reading child output failed after {} bytes: {error}", buf.len());
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(handle: JoinHandle<String>, description: &str) -> String {
    handle.join().unwrap_or_else(|_| {
        warn!("Output reader of `{description}` panicked, its output is lost");
        String::new()
    })
}

#[allow(non_snake_case)]
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn run_command__captures_stdout_and_stderr() -> Result<()> {
        let output = run_command(
            Command::new("sh").args(["-c", "echo out; echo err >&2"]),
            Duration::from_secs(10),
        )?;
        assert!(output.status.success());
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        Ok(())
    }

    #[test]
    fn run_command__failing_command_is_not_an_error() -> Result<()> {
        let output = run_command(Command::new("sh").args(["-c", "exit 3"]), Duration::from_secs(10))?;
        assert!(!output.status.success());
        assert!(output.stdout.is_empty());
        Ok(())
    }

    #[test]
    fn run_command__times_out() {
        let result = run_command(Command::new("sleep").arg("5"), Duration::from_millis(100));
        assert!(matches!(result, Err(Error::Timeout { .. })));
    }

    #[test]
    fn run_command__missing_program() {
        let result = run_command(&mut Command::new("qstats-no-such-binary"), Duration::from_secs(1));
        assert!(matches!(result, Err(Error::Spawn { .. })));
    }

    struct BrokenPipe {
        sent: bool,
    }

    impl Read for BrokenPipe {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.sent {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"head");
            Ok(4)
        }
    }

    #[test]
    fn drain__failed_read_keeps_partial_output() {
        let handle = drain(Some(BrokenPipe { sent: false }));
        assert_eq!(collect(handle, "broken"), "head");
    }

    #[test]
    fn collect__panicked_reader_gives_empty_output() {
        let handle = thread::spawn(|| -> String { panic!("reader failed") });
        assert_eq!(collect(handle, "panicking"), "");
    }

    #[test]
    fn describe__joins_program_and_args() {
        let mut command = Command::new("qstat");
        command.args(["-xml", "-u", "*"]);
        assert_eq!(describe(&command), "qstat -xml -u *");
    }
}
