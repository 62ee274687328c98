//! Shared integration-test harness for running the `lullaby` binary.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};

/// Upper bound for a `run` invocation to finish.
pub const RUN_TIMEOUT: Duration = Duration::from_secs(10);

/// Path to the compiled binary.
#[must_use]
pub fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_lullaby")
}

/// Returns the path to a test fixture.
#[must_use]
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Runs the binary to completion with a closed stdin.
#[allow(clippy::missing_panics_doc)]
pub fn spawn_command(args: &[&str]) -> Output {
    std::process::Command::new(bin())
        .args(args)
        .env_remove("LULLABY_LOG_LEVEL")
        .stdin(Stdio::null())
        .output()
        .expect("failed to run lullaby")
}

/// A running `lullaby run` process with a writable stdin.
///
/// The child process is killed on drop via `kill_on_drop(true)`.
pub struct LullabyProcess {
    child: Child,
    stdin: Option<ChildStdin>,
}

impl LullabyProcess {
    /// Spawns `lullaby run` with extra arguments.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn_run(args: &[&str]) -> Self {
        let mut child = Command::new(bin())
            .arg("run")
            .args(args)
            .env_remove("LULLABY_LOG_LEVEL")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .expect("failed to spawn lullaby");
        let stdin = child.stdin.take();
        Self { child, stdin }
    }

    /// Writes one command line to stdin.
    #[allow(clippy::missing_panics_doc)]
    pub async fn send(&mut self, command: &str) {
        let stdin = self.stdin.as_mut().expect("stdin already closed");
        stdin
            .write_all(format!("{command}\n").as_bytes())
            .await
            .expect("failed to write to stdin");
        stdin.flush().await.expect("failed to flush stdin");
    }

    /// Closes stdin.
    pub fn close_stdin(&mut self) {
        self.stdin = None;
    }

    /// Waits for the process to exit and collects its output.
    #[allow(clippy::missing_panics_doc)]
    pub async fn finish(self) -> Output {
        let Self { child, stdin } = self;
        drop(stdin);
        tokio::time::timeout(RUN_TIMEOUT, child.wait_with_output())
            .await
            .expect("lullaby run did not exit in time")
            .expect("failed to collect output")
    }
}
