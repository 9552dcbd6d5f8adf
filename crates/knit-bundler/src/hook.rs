//! The `onSuccess` hook.
//!
//! A shell command runs in its own process group so cancelling it takes the
//! whole process tree down. A callback receives a cancellation token
//! instead. Starting a new run always cancels the previous one.

use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use knit_config::{OnSuccess, ResolvedConfig, SuccessCallback};
use parking_lot::Mutex;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{BuildError, Result};

/// Exit code the process should end with. Non-zero once any success
/// command failed.
#[derive(Debug, Clone, Default)]
pub struct ExitCode(Arc<AtomicI32>);

impl ExitCode {
    pub fn get(&self) -> i32 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self, code: i32) {
        self.0.store(code, Ordering::SeqCst);
    }
}

/// Success hook of one pipeline.
pub struct SuccessHook {
    running: Mutex<Option<CancellationToken>>,
    exit_code: ExitCode,
}

impl SuccessHook {
    pub fn new(exit_code: ExitCode) -> Self {
        Self {
            running: Mutex::new(None),
            exit_code,
        }
    }

    /// Cancel the running invocation, if any.
    pub fn cancel(&self) {
        if let Some(token) = self.running.lock().take() {
            token.cancel();
        }
    }

    /// Run the hook of `config` in the background. Returns `None` when the
    /// config has no hook.
    pub fn start(&self, config: Arc<ResolvedConfig>) -> Option<JoinHandle<Result<()>>> {
        let hook = config.on_success.clone()?;
        let token = CancellationToken::new();
        if let Some(previous) = self.running.lock().replace(token.clone()) {
            previous.cancel();
        }

        let exit_code = self.exit_code.clone();
        Some(tokio::spawn(async move {
            match hook {
                OnSuccess::Command(command) => {
                    run_command(&command, &config, token, exit_code).await
                }
                OnSuccess::Callback(callback) => run_callback(callback, config, token).await,
            }
        }))
    }
}

impl Drop for SuccessHook {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn shell(command: &str) -> Command {
    #[cfg(unix)]
    {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd.process_group(0);
        cmd
    }
    #[cfg(not(unix))]
    {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    }
}

async fn run_command(
    command: &str,
    config: &ResolvedConfig,
    token: CancellationToken,
    exit_code: ExitCode,
) -> Result<()> {
    tracing::debug!("Running onSuccess command: {command}");
    let mut child = shell(command)
        .current_dir(&config.cwd)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| BuildError::Hook(format!("failed to run `{command}`: {e}")))?;

    tokio::select! {
        status = child.wait() => {
            let status = status?;
            if let Some(code) = status.code().filter(|code| *code != 0) {
                tracing::debug!("onSuccess command exited with {code}");
                exit_code.set(code);
            }
        }
        _ = token.cancelled() => {
            kill_tree(&mut child).await;
        }
    }
    Ok(())
}

/// Terminate the process tree of `child`. Failures are logged only.
async fn kill_tree(child: &mut Child) {
    let Some(pid) = child.id() else {
        // Already reaped.
        return;
    };

    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        tracing::debug!("Killing onSuccess process group {pid}");
        if let Err(err) = killpg(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            tracing::warn!("Failed to kill onSuccess process group {pid}: {err}");
        }
    }

    #[cfg(windows)]
    {
        tracing::debug!("Killing onSuccess process tree {pid}");
        let killed = Command::new("taskkill")
            .args(taskkill_args(pid))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match killed {
            Ok(status) if status.success() => {}
            Ok(status) => {
                tracing::warn!("taskkill of onSuccess process {pid} exited with {status}")
            }
            Err(err) => tracing::warn!("Failed to run taskkill for process {pid}: {err}"),
        }
    }

    #[cfg(not(any(unix, windows)))]
    if let Err(err) = child.start_kill() {
        tracing::warn!("Failed to kill onSuccess process {pid}: {err}");
    }

    let _ = child.wait().await;
}

/// `taskkill` arguments ending `pid` and every process it started.
#[cfg(any(windows, test))]
fn taskkill_args(pid: u32) -> [String; 4] {
    ["/T".into(), "/F".into(), "/PID".into(), pid.to_string()]
}

async fn run_callback(
    callback: SuccessCallback,
    config: Arc<ResolvedConfig>,
    token: CancellationToken,
) -> Result<()> {
    callback(config, token)
        .await
        .map_err(|e| BuildError::Hook(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taskkill_takes_down_the_whole_tree() {
        assert_eq!(taskkill_args(4242), ["/T", "/F", "/PID", "4242"]);
    }
}
