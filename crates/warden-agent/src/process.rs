use std::{path::PathBuf, process::Stdio};

use anyhow::Context;
use tokio::process::Command;

use crate::pump::OutputPump;

/// Fully resolved spawn parameters for one instance.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    /// The instance workspace; the child runs with this as its cwd.
    pub cwd: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TermTier {
    NotYet,
    Signaled,
}

/// Owns one child OS process.
#[derive(Debug)]
pub struct ProcessHandle {
    child: tokio::process::Child,
    pid: Option<u32>,
    exit: Option<std::process::ExitStatus>,
    term: TermTier,
}

impl ProcessHandle {
    /// Spawns the child with piped console streams and hands the streams to
    /// an [`OutputPump`].
    pub fn start(spec: &LaunchSpec) -> anyhow::Result<(Self, OutputPump)> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .current_dir(&spec.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawn {} (cwd {})", spec.program, spec.cwd.display()))?;

        let pump = OutputPump::new(child.stdin.take(), child.stdout.take(), child.stderr.take());
        let pid = child.id();
        let handle = Self {
            child,
            pid,
            exit: None,
            term: TermTier::NotYet,
        };
        Ok((handle, pump))
    }

    pub fn is_alive(&mut self) -> bool {
        if self.exit.is_some() {
            return false;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.exit = Some(status);
                false
            }
            Ok(None) => true,
            Err(err) => {
                tracing::debug!(error = %err, "process liveness check failed");
                false
            }
        }
    }

    pub fn exit_status(&self) -> Option<std::process::ExitStatus> {
        self.exit
    }

    /// Asks the child to terminate. SIGTERM on unix; elsewhere there is no
    /// graceful tier and this kills outright.
    pub fn signal_graceful(&mut self) {
        #[cfg(unix)]
        {
            if let Some(pid) = self.pid {
                unsafe {
                    libc::kill(pid as i32, libc::SIGTERM);
                }
            }
        }
        #[cfg(not(unix))]
        self.kill_forced();
    }

    pub fn kill_forced(&mut self) {
        if let Err(err) = self.child.start_kill() {
            // Already exited is the common case here.
            tracing::debug!(error = %err, "forced kill not delivered");
        }
    }

    /// Idempotent two-tier termination: the first call signals gracefully,
    /// every later call forces a kill.
    pub fn terminate(&mut self) {
        match self.term {
            TermTier::NotYet => {
                self.signal_graceful();
                self.term = TermTier::Signaled;
            }
            TermTier::Signaled => self.kill_forced(),
        }
    }
}
