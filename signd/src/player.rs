//! External player supervision
//!
//! `PlayerSupervisor` owns the single external player process handle and its
//! lifecycle: `Stopped → Starting → Running → Stopped`. All mutation funnels
//! through `restart`/`stop`, serialized by an internal mutex so concurrent
//! catalog mutations can never double-spawn or double-terminate the player.
//!
//! There is no watchdog: a player that dies on its own is only noticed by the
//! next `currently_running` check or restart.

use crate::config::PlayerConfig;
use crate::error::{Error, Result};
use crate::playlist::Playlist;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Player lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerPhase {
    Stopped,
    /// Transient: spawn in progress
    Starting,
    Running,
}

struct PlayerState {
    child: Option<Child>,
    phase: PlayerPhase,
}

/// Owner of the external playback process
pub struct PlayerSupervisor {
    config: PlayerConfig,
    playlist_path: PathBuf,
    state: Mutex<PlayerState>,
}

impl PlayerSupervisor {
    pub fn new(config: PlayerConfig, playlist_path: PathBuf) -> Self {
        Self {
            config,
            playlist_path,
            state: Mutex::new(PlayerState {
                child: None,
                phase: PlayerPhase::Stopped,
            }),
        }
    }

    /// Stop the current player (if any), write the playlist artifact and
    /// start playback over it
    ///
    /// Returns true iff the player is running afterwards. An empty playlist
    /// leaves the player stopped; spawn failures are logged and recovered
    /// here, never escalated to the catalog-mutation caller.
    pub async fn restart(&self, playlist: &Playlist) -> bool {
        let mut state = self.state.lock().await;

        self.terminate_locked(&mut state).await;

        if let Err(e) = playlist.write(&self.playlist_path).await {
            error!("Failed to write playlist {:?}: {}", self.playlist_path, e);
            return false;
        }

        if playlist.is_empty() {
            info!("Playlist is empty; player left stopped");
            return false;
        }

        state.phase = PlayerPhase::Starting;
        match self.spawn() {
            Ok(child) => {
                info!(
                    "Started player '{}' over {} entries",
                    self.config.command,
                    playlist.len()
                );
                state.child = Some(child);
                state.phase = PlayerPhase::Running;
                true
            }
            Err(e) => {
                error!("Failed to start player '{}': {}", self.config.command, e);
                state.phase = PlayerPhase::Stopped;
                false
            }
        }
    }

    /// Terminate the player and stay stopped (used at daemon shutdown)
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        self.terminate_locked(&mut state).await;
    }

    /// True iff the phase is Running and the process has not exited
    ///
    /// Liveness is checked lazily here; a child that exited on its own flips
    /// the phase back to Stopped.
    pub async fn currently_running(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.phase != PlayerPhase::Running {
            return false;
        }
        match state.child.as_mut().map(|c| c.try_wait()) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                debug!("Player exited on its own: {}", status);
                state.child = None;
                state.phase = PlayerPhase::Stopped;
                false
            }
            Some(Err(e)) => {
                warn!("Failed to poll player process: {}", e);
                false
            }
            None => {
                state.phase = PlayerPhase::Stopped;
                false
            }
        }
    }

    fn spawn(&self) -> Result<Child> {
        Command::new(&self.config.command)
            .args(&self.config.args)
            .arg(&self.playlist_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Playback(format!("spawn failed: {}", e)))
    }

    /// Termination protocol: cooperative signal, bounded wait, force-kill
    ///
    /// Ends with the handle cleared and the phase Stopped on every path.
    async fn terminate_locked(&self, state: &mut PlayerState) {
        if let Some(mut child) = state.child.take() {
            request_exit(&child);
            match timeout(self.config.grace_period(), child.wait()).await {
                Ok(Ok(status)) => debug!("Player exited: {}", status),
                Ok(Err(e)) => warn!("Failed to reap player process: {}", e),
                Err(_) => {
                    warn!(
                        "Player did not exit within {:?}; force-killing",
                        self.config.grace_period()
                    );
                    if let Err(e) = child.kill().await {
                        error!("Failed to kill player process: {}", e);
                    }
                }
            }
        }
        state.phase = PlayerPhase::Stopped;
    }
}

/// Ask the child to exit cooperatively
#[cfg(unix)]
fn request_exit(child: &Child) {
    if let Some(pid) = child.id() {
        // SIGTERM; the bounded wait in the caller escalates to SIGKILL.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }
}

#[cfg(not(unix))]
fn request_exit(_child: &Child) {
    // No cooperative signal available; the caller's kill() handles it.
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::PlaylistEntry;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    /// Player stub: `sh -c <script> player <playlist>`
    fn stub_player(script: &str, grace_secs: u64) -> PlayerConfig {
        PlayerConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string(), "player".to_string()],
            grace_period_secs: grace_secs,
        }
    }

    fn supervisor(dir: &TempDir, script: &str, grace_secs: u64) -> PlayerSupervisor {
        PlayerSupervisor::new(
            stub_player(script, grace_secs),
            dir.path().join("playlist.m3u"),
        )
    }

    fn one_entry_playlist() -> Playlist {
        Playlist {
            entries: vec![PlaylistEntry {
                path: "/dev/null".into(),
                duration: 10,
                name: "entry".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_restart_with_empty_playlist_stays_stopped() {
        let dir = TempDir::new().unwrap();
        let supervisor = supervisor(&dir, "sleep 30", 5);

        let running = supervisor.restart(&Playlist::default()).await;

        assert!(!running);
        assert!(!supervisor.currently_running().await);
        // The artifact is still written (header only).
        let artifact = std::fs::read_to_string(dir.path().join("playlist.m3u")).unwrap();
        assert_eq!(artifact, "#EXTM3U\n");
    }

    #[tokio::test]
    async fn test_restart_spawns_and_reports_running() {
        let dir = TempDir::new().unwrap();
        let supervisor = supervisor(&dir, "sleep 30", 5);

        let running = supervisor.restart(&one_entry_playlist()).await;

        assert!(running);
        assert!(supervisor.currently_running().await);

        supervisor.stop().await;
        assert!(!supervisor.currently_running().await);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_recovered_locally() {
        let dir = TempDir::new().unwrap();
        let supervisor = PlayerSupervisor::new(
            PlayerConfig {
                command: "/nonexistent/player-binary".to_string(),
                args: vec![],
                grace_period_secs: 5,
            },
            dir.path().join("playlist.m3u"),
        );

        let running = supervisor.restart(&one_entry_playlist()).await;

        assert!(!running);
        assert!(!supervisor.currently_running().await);
    }

    #[tokio::test]
    async fn test_self_exit_is_detected_lazily() {
        let dir = TempDir::new().unwrap();
        let supervisor = supervisor(&dir, "exit 0", 5);

        assert!(supervisor.restart(&one_entry_playlist()).await);

        // Give the stub time to exit on its own.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!supervisor.currently_running().await);
    }

    #[tokio::test]
    async fn test_restart_replaces_running_player() {
        let dir = TempDir::new().unwrap();
        let supervisor = supervisor(&dir, "sleep 30", 5);

        assert!(supervisor.restart(&one_entry_playlist()).await);
        assert!(supervisor.restart(&one_entry_playlist()).await);
        assert!(supervisor.currently_running().await);

        supervisor.stop().await;
    }

    #[tokio::test]
    async fn test_sigterm_ignoring_player_is_force_killed() {
        let dir = TempDir::new().unwrap();
        let supervisor = supervisor(&dir, "trap '' TERM; sleep 30", 1);

        assert!(supervisor.restart(&one_entry_playlist()).await);
        // Let the stub install its trap before we ask it to exit.
        tokio::time::sleep(Duration::from_millis(300)).await;

        let start = Instant::now();
        let running = supervisor.restart(&one_entry_playlist()).await;
        let elapsed = start.elapsed();

        assert!(running);
        assert!(supervisor.currently_running().await);
        // Bounded by the grace period, not the stub's 30 s sleep.
        assert!(elapsed < Duration::from_secs(10));

        supervisor.stop().await;
    }

    #[tokio::test]
    async fn test_restart_after_empty_then_nonempty() {
        let dir = TempDir::new().unwrap();
        let supervisor = supervisor(&dir, "sleep 30", 5);

        assert!(!supervisor.restart(&Playlist::default()).await);
        assert!(supervisor.restart(&one_entry_playlist()).await);

        supervisor.stop().await;
    }
}
