//! External tool execution
//!
//! Every process the pipeline shells out to (compiler, packager, transport)
//! goes through a [`ToolRunner`]. The system runner spawns the process with an
//! explicit environment overlay, drains its output on helper threads and kills
//! it once the invocation's timeout expires. On unix each tool runs in its own
//! process group and the whole group is killed, so helpers such as the `ssh`
//! behind `scp` or the `compile`/`link` steps behind `go build` go with it.

use crate::core::error::ToolFailure;
use serde::Serialize;
use std::io::{self, Read};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// How long to keep reading output after a timed-out tool was killed
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// A fully described external process call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
  pub program: String,
  pub args: Vec<String>,
  /// Working directory (inherits ours when unset)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cwd: Option<PathBuf>,
  /// Variables added to the child's environment only
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub env: Vec<(String, String)>,
  #[serde(skip)]
  pub timeout: Duration,
}

impl Invocation {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: None,
      env: Vec::new(),
      timeout: Duration::from_secs(60),
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

  pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.cwd = Some(dir.into());
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.push((key.into(), value.into()));
    self
  }

  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Shell-like rendering for messages and plans
  pub fn command_line(&self) -> String {
    let mut parts = Vec::with_capacity(self.env.len() + self.args.len() + 1);
    for (key, value) in &self.env {
      parts.push(format!("{}={}", key, quote(value)));
    }
    parts.push(quote(&self.program));
    parts.extend(self.args.iter().map(|a| quote(a)));
    parts.join(" ")
  }

  /// Convert a finished-but-failed run into a stage diagnostic
  pub fn failure(&self, output: &ToolOutput) -> ToolFailure {
    let mut text = output.stderr.trim().to_string();
    let stdout = output.stdout.trim();
    if !stdout.is_empty() {
      if !text.is_empty() {
        text.push('\n');
      }
      text.push_str(stdout);
    }
    if output.timed_out {
      if !text.is_empty() {
        text.push('\n');
      }
      text.push_str(&format!("timed out after {} seconds", self.timeout.as_secs()));
    }

    ToolFailure {
      command: self.command_line(),
      status: output.code,
      output: text,
    }
  }

  /// Diagnostic for a process that could not be started at all
  pub fn spawn_failure(&self, err: &io::Error) -> ToolFailure {
    let output = if err.kind() == io::ErrorKind::NotFound {
      format!("failed to start {}: program not found", self.program)
    } else {
      format!("failed to start {}: {}", self.program, err)
    };

    ToolFailure {
      command: self.command_line(),
      status: None,
      output,
    }
  }
}

fn quote(s: &str) -> String {
  if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || "-_./:=~@+,".contains(c)) {
    s.to_string()
  } else {
    format!("'{}'", s.replace('\'', r"'\''"))
  }
}

/// What an external process left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
  /// Exit code; `None` when killed by a signal or on timeout
  pub code: Option<i32>,
  pub timed_out: bool,
  pub stdout: String,
  pub stderr: String,
  pub elapsed: Duration,
}

impl ToolOutput {
  pub fn success(&self) -> bool {
    !self.timed_out && self.code == Some(0)
  }
}

/// Seam between the pipeline and the operating system
pub trait ToolRunner {
  /// Run to completion (or timeout). `Err` only when the process could not be started.
  fn run(&self, invocation: &Invocation) -> io::Result<ToolOutput>;
}

/// Runs tools as real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
  fn run(&self, invocation: &Invocation) -> io::Result<ToolOutput> {
    let mut cmd = Command::new(&invocation.program);
    cmd
      .args(&invocation.args)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped());

    if let Some(dir) = &invocation.cwd {
      cmd.current_dir(dir);
    }
    for (key, value) in &invocation.env {
      cmd.env(key, value);
    }
    #[cfg(unix)]
    cmd.process_group(0);

    tracing::debug!(command = %invocation.command_line(), timeout_secs = invocation.timeout.as_secs(), "spawning");
    let started = Instant::now();
    let mut child = cmd.spawn()?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let (code, timed_out) = match child.wait_timeout(invocation.timeout)? {
      Some(status) => (status.code(), false),
      None => {
        kill(&mut child);
        (None, true)
      }
    };

    // After a kill, anything that escaped the group may still hold the pipes
    let grace = timed_out.then_some(DRAIN_GRACE);
    let output = ToolOutput {
      code,
      timed_out,
      stdout: collect(stdout, grace),
      stderr: collect(stderr, grace),
      elapsed: started.elapsed(),
    };

    tracing::debug!(
      program = %invocation.program,
      code = ?output.code,
      timed_out = output.timed_out,
      elapsed_ms = output.elapsed.as_millis() as u64,
      "finished"
    );

    Ok(output)
  }
}

fn kill(child: &mut Child) {
  #[cfg(unix)]
  kill_group(child.id());
  let _ = child.kill();
  let _ = child.wait();
}

/// SIGKILL the process group led by `pid`
#[cfg(unix)]
fn kill_group(pid: u32) {
  let Ok(pgid) = libc::pid_t::try_from(pid) else {
    return;
  };
  // Negative pid addresses the whole group
  let ret = unsafe { libc::kill(-pgid, libc::SIGKILL) };
  if ret != 0 {
    tracing::debug!(pgid, error = %io::Error::last_os_error(), "failed to kill process group");
  }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<String>> {
  pipe.map(|mut pipe| {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
      let mut buf = Vec::new();
      let _ = pipe.read_to_end(&mut buf);
      let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
  })
}

fn collect(rx: Option<Receiver<String>>, grace: Option<Duration>) -> String {
  let Some(rx) = rx else {
    return String::new();
  };
  match grace {
    Some(grace) => rx.recv_timeout(grace).unwrap_or_default(),
    None => rx.recv().unwrap_or_default(),
  }
}
