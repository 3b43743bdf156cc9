//! Single thread reading the register pipe, forwarding admin snapshot
//! requests, and enqueueing connection requests (C9).

use std::fs::{File, OpenOptions};
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use pacman_common::protocol::Connect;
use tracing::{info, warn};

use crate::request_queue::{ConnectionRequest, RequestQueueProducer};
use crate::session::{ServerContext, SessionTable};

/// `poll` timeout on the register pipe: bounds how long a SIGUSR1 can sit
/// unhandled behind the wait before the loop comes back around to check
/// `admin_signal` (§8: "After SIGUSR1, `top5_clients.txt` exists").
const ADMIN_POLL_INTERVAL_MS: u16 = 200;

#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("could not open register pipe {0}: {1}")]
    OpenPipe(PathBuf, std::io::Error),
}

/// Opens the register pipe O_RDWR so the listener never observes EOF
/// between clients (§4.8).
pub fn open_register_pipe(path: &Path) -> Result<File, ListenerError> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| ListenerError::OpenPipe(path.to_path_buf(), e))
}

/// Writes the top-5 scoreboard snapshot (§6) to `top5_clients.txt` in the
/// current directory.
pub fn write_admin_snapshot(sessions: &SessionTable) -> std::io::Result<()> {
    let mut scores = sessions.active_scores();
    scores.sort_by(|a, b| b.1.cmp(&a.1));

    let mut out = String::from("Top clients by score\n\n");
    if scores.is_empty() {
        out.push_str("No active clients.\n");
    } else {
        for (rank, (client_id, points)) in scores.iter().take(5).enumerate() {
            out.push_str(&format!("{}. Client ID {} - {} points\n", rank + 1, client_id, points));
        }
    }

    std::fs::write("top5_clients.txt", out)
}

/// Waits for the register pipe to become readable, returning `true` if it
/// is (a frame is waiting) or `false` on a plain timeout. The timeout is
/// what makes SIGUSR1 handling prompt: the loop re-checks `admin_signal`
/// every `ADMIN_POLL_INTERVAL_MS` instead of parking in a single indefinite
/// `read`, so it no longer matters whether the signal handler restarts
/// interrupted syscalls.
fn register_pipe_readable(register_pipe: &File) -> std::io::Result<bool> {
    let mut fds = [PollFd::new(register_pipe.as_fd(), PollFlags::POLLIN)];
    let ready = poll(&mut fds, PollTimeout::from(ADMIN_POLL_INTERVAL_MS))
        .map_err(std::io::Error::from)?;
    Ok(ready > 0)
}

/// Runs the listener loop until the register pipe is closed for good
/// (never, in normal operation — see §4.8).
pub fn run(
    mut register_pipe: File,
    producer: RequestQueueProducer,
    ctx: Arc<ServerContext>,
    admin_signal: Arc<AtomicBool>,
) {
    loop {
        if admin_signal.swap(false, Ordering::SeqCst) {
            if let Err(err) = write_admin_snapshot(&ctx.sessions) {
                warn!(?err, "failed to write admin snapshot");
            }
        }

        match register_pipe_readable(&register_pipe) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(err) => {
                warn!(?err, "poll on register pipe failed");
                std::thread::sleep(Duration::from_millis(ADMIN_POLL_INTERVAL_MS as u64));
                continue;
            }
        }

        match Connect::read_from(&mut register_pipe) {
            Ok(connect) => {
                let request = ConnectionRequest {
                    client_id: connect.client_id,
                    request_pipe: connect.request_pipe,
                    notification_pipe: connect.board_pipe,
                };
                info!(client_id = request.client_id, "received connect request");
                if producer.insert(request).is_err() {
                    warn!("request queue is gone, dropping connect request");
                    return;
                }
            }
            Err(err) => {
                warn!(?err, "discarding malformed frame on register pipe");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_with_no_sessions_reports_none_active() {
        let table = SessionTable::new(2);
        let mut scores = table.active_scores();
        scores.sort_by(|a, b| b.1.cmp(&a.1));
        assert!(scores.is_empty());
    }

    #[test]
    fn snapshot_orders_by_points_descending() {
        let table = SessionTable::new(3);
        let s0 = table
            .claim(|slot| crate::session::Session::new(slot, 0, "/tmp/0_req".into(), "/tmp/0_notif".into()))
            .unwrap();
        s0.flags.lock().accumulated_points = 10;
        let s1 = table
            .claim(|slot| crate::session::Session::new(slot, 1, "/tmp/1_req".into(), "/tmp/1_notif".into()))
            .unwrap();
        s1.flags.lock().accumulated_points = 50;
        let s2 = table
            .claim(|slot| crate::session::Session::new(slot, 2, "/tmp/2_req".into(), "/tmp/2_notif".into()))
            .unwrap();
        s2.flags.lock().accumulated_points = 30;

        let mut scores = table.active_scores();
        scores.sort_by(|a, b| b.1.cmp(&a.1));
        assert_eq!(scores, vec![(1, 50), (2, 30), (0, 10)]);
    }
}
