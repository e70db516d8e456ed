//! Transcoder processes and their process groups.
//!
//! Every transcoder is spawned as the leader of a fresh process group so the
//! whole tree, including helpers ffmpeg forks, can be killed with one signal.

use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Kill capability for a spawned transcoder's process group.
///
/// Holding a `ProcessGroup` does not keep the process alive; it is only the
/// id needed to signal it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessGroup {
    pgid: i32,
}

impl ProcessGroup {
    /// Process group id (equal to the leader's pid).
    pub fn id(&self) -> i32 {
        self.pgid
    }

    /// Send SIGKILL to every process in the group.
    ///
    /// A group that no longer exists is not an error.
    #[cfg(unix)]
    pub fn terminate(&self) -> MediaResult<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        match killpg(Pid::from_raw(self.pgid), Signal::SIGKILL) {
            Ok(()) => {
                debug!(pgid = self.pgid, "Sent SIGKILL to process group");
                Ok(())
            }
            Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(MediaError::Signal {
                pgid: self.pgid,
                message: e.to_string(),
            }),
        }
    }

    #[cfg(not(unix))]
    pub fn terminate(&self) -> MediaResult<()> {
        Err(MediaError::Unsupported(
            "process group termination requires unix".to_string(),
        ))
    }

    /// Whether any process (including zombies) is still a member of the group.
    #[cfg(unix)]
    pub fn is_alive(&self) -> bool {
        use nix::sys::signal::killpg;
        use nix::unistd::Pid;

        killpg(Pid::from_raw(self.pgid), None).is_ok()
    }

    #[cfg(not(unix))]
    pub fn is_alive(&self) -> bool {
        false
    }
}

/// A freshly spawned transcoder.
///
/// The `child` is awaited by whoever supervises the process; the `group`
/// is shared with whoever may need to kill it.
#[derive(Debug)]
pub struct SpawnedProcess {
    pub child: Child,
    pub group: ProcessGroup,
}

/// Spawn `command` as the leader of a new process group.
///
/// stdin and stdout are discarded; stderr is piped so callers can forward
/// diagnostics.
pub fn spawn_in_group(mut command: Command) -> MediaResult<SpawnedProcess> {
    let program = command
        .as_std()
        .get_program()
        .to_string_lossy()
        .to_string();

    #[cfg(unix)]
    command.process_group(0);

    let child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound && program.ends_with("ffmpeg") {
                MediaError::FfmpegNotFound
            } else {
                MediaError::spawn(program.clone(), e)
            }
        })?;

    let pid = child
        .id()
        .ok_or_else(|| MediaError::internal("spawned child has no pid"))?;
    let pgid = i32::try_from(pid).map_err(|_| MediaError::internal("pid out of range"))?;

    debug!(program = %program, pgid, "Spawned process group");

    Ok(SpawnedProcess {
        child,
        group: ProcessGroup { pgid },
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[tokio::test]
    async fn test_spawned_process_leads_its_group() {
        let mut spawned = spawn_in_group(sh("exec sleep 30")).unwrap();
        let pid = spawned.child.id().unwrap() as i32;
        assert_eq!(spawned.group.id(), pid);
        assert!(spawned.group.is_alive());

        spawned.group.terminate().unwrap();
        let status = tokio::time::timeout(Duration::from_secs(5), spawned.child.wait())
            .await
            .expect("child should die after SIGKILL")
            .unwrap();
        assert!(!status.success());
        assert!(!spawned.group.is_alive());
    }

    #[tokio::test]
    async fn test_terminate_reaches_grandchildren() {
        // The shell stays alive as leader while `sleep` runs as a second member.
        let mut spawned = spawn_in_group(sh("sleep 30 & wait")).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        spawned.group.terminate().unwrap();
        let status = tokio::time::timeout(Duration::from_secs(5), spawned.child.wait())
            .await
            .expect("leader should die after SIGKILL")
            .unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn test_terminate_after_exit_is_benign() {
        let mut spawned = spawn_in_group(sh("exit 3")).unwrap();
        let status = spawned.child.wait().await.unwrap();
        assert_eq!(status.code(), Some(3));

        tokio_test::assert_ok!(spawned.group.terminate());
        tokio_test::assert_ok!(spawned.group.terminate());
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let err = spawn_in_group(Command::new("/nonexistent/transcoder")).unwrap_err();
        assert!(matches!(err, MediaError::Spawn { .. }));
    }
}
