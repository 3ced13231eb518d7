//! Running external wrap/unwrap executables.
//!
//! Methods such as gpg talk to an executable through [`Runner`], which
//! feeds bytes to the child's stdin and returns its stdout. Tests swap in
//! a fake runner; production uses [`SystemRunner`].

use std::fmt;
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::error::ProcessError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Shared flag that aborts any run observing it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Deadline and cancellation applied to every subprocess of one operation.
#[derive(Debug, Clone, Default)]
pub struct Context {
    timeout: Option<Duration>,
    cancel: CancelToken,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit each subprocess to `timeout` of wall-clock time.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Runs an invocation with `stdin` as input, returning captured stdout.
///
/// A non-zero exit is an error carrying the captured stderr.
pub trait Runner: Send + Sync {
    fn run(
        &self,
        invocation: &Invocation,
        stdin: &[u8],
        ctx: &Context,
    ) -> Result<Vec<u8>, ProcessError>;
}

/// Runs invocations as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(
        &self,
        invocation: &Invocation,
        stdin: &[u8],
        ctx: &Context,
    ) -> Result<Vec<u8>, ProcessError> {
        let command = invocation.to_string();
        if ctx.is_cancelled() {
            return Err(ProcessError::Cancelled { command });
        }

        trace!(command = %command, stdin_len = stdin.len(), "spawning");

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        // Feed stdin and drain both outputs concurrently so a chatty child
        // cannot deadlock on a full pipe.
        let input = stdin.to_vec();
        let mut child_stdin = child.stdin.take();
        let writer = thread::spawn(move || -> std::io::Result<()> {
            if let Some(pipe) = child_stdin.as_mut() {
                pipe.write_all(&input)?;
            }
            Ok(())
        });
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let started = Instant::now();
        let status = loop {
            let polled = child.try_wait().map_err(|source| ProcessError::Io {
                program: invocation.program.clone(),
                source,
            })?;
            if let Some(status) = polled {
                break status;
            }

            if ctx.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                debug!(command = %command, "cancelled");
                return Err(ProcessError::Cancelled { command });
            }
            if let Some(timeout) = ctx.timeout() {
                if started.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    debug!(command = %command, ?timeout, "timed out");
                    return Err(ProcessError::TimedOut {
                        command,
                        after: timeout,
                    });
                }
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = join(stdout, &invocation.program)?;
        let stderr = join(stderr, &invocation.program)?;
        // A child that exits without reading its input closes the pipe
        // early; its exit status decides success, not the broken pipe.
        let _ = writer.join();

        trace!(command = %command, %status, stdout_len = stdout.len(), "exited");

        if !status.success() {
            return Err(ProcessError::Failed {
                command,
                status,
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
            });
        }

        Ok(stdout)
    }
}

type Drain = Option<thread::JoinHandle<std::io::Result<Vec<u8>>>>;

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Drain {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn join(handle: Drain, program: &str) -> Result<Vec<u8>, ProcessError> {
    let Some(handle) = handle else {
        return Ok(Vec::new());
    };
    let io = |source| ProcessError::Io {
        program: program.to_string(),
        source,
    };
    handle
        .join()
        .map_err(|_| io(std::io::Error::other("output reader panicked")))?
        .map_err(io)
}
