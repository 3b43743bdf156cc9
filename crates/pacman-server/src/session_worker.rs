//! One thread per worker slot: binds a connection request to a session
//! record and owns the pacman/broadcaster/ghost trio's lifecycle (C8).

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use pacman_common::level;
use pacman_common::protocol::ConnectAck;
use tracing::{info, warn};

use crate::broadcaster;
use crate::ghost_worker;
use crate::pacman_worker;
use crate::request_queue::RequestQueueConsumer;
use crate::session::{ServerContext, Session};

/// §4.7, steps 1–9. Runs forever, one request at a time.
pub fn run(consumer: RequestQueueConsumer, ctx: Arc<ServerContext>) {
    loop {
        let request = match consumer.remove() {
            Ok(req) => req,
            Err(_) => return,
        };

        let session = match ctx.sessions.claim(|slot| {
            Session::new(
                slot,
                request.client_id,
                PathBuf::from(&request.request_pipe),
                PathBuf::from(&request.notification_pipe),
            )
        }) {
            Some(session) => session,
            None => {
                warn!(client_id = request.client_id, "no free session slot");
                continue;
            }
        };

        if let Err(err) = serve_session(&session, &ctx.levels_dir) {
            warn!(client_id = request.client_id, ?err, "session setup failed");
        }

        cleanup_session(&session);
        ctx.sessions.release(session.slot);
    }
}

#[derive(Debug, thiserror::Error)]
enum SetupError {
    #[error("could not open notification pipe: {0}")]
    OpenNotification(std::io::Error),
    #[error("short write on CONNECT-ACK: {0}")]
    WriteAck(#[from] pacman_common::ProtocolError),
    #[error("could not open request pipe: {0}")]
    OpenRequest(std::io::Error),
    #[error("level load failed: {0}")]
    LevelLoad(#[from] pacman_common::LevelError),
}

fn serve_session(session: &Arc<Session>, levels_dir: &Path) -> Result<(), SetupError> {
    let mut notification_pipe = OpenOptions::new()
        .write(true)
        .open(&session.notification_pipe_path)
        .map_err(SetupError::OpenNotification)?;

    ConnectAck { accepted: true }.write_to(&mut notification_pipe)?;
    *session.notification_pipe.lock() = Some(notification_pipe);

    let request_pipe = OpenOptions::new()
        .read(true)
        .open(&session.request_pipe_path)
        .map_err(SetupError::OpenRequest)?;

    let total_levels = level::count(levels_dir)?;
    {
        let mut board = session.board.write();
        level::load_nth(&mut board, levels_dir, 0, 0)?;
    }
    {
        let mut flags = session.flags.lock();
        flags.total_levels = total_levels;
        flags.current_level = 0;
    }

    let ghost_count = session.board.read().ghosts.len();
    let mut ghost_handles = Vec::with_capacity(ghost_count);
    for ghost_index in 0..ghost_count {
        let session = session.clone();
        ghost_handles.push(thread::spawn(move || ghost_worker::run(session, ghost_index)));
    }
    *session.ghost_handles.lock() = ghost_handles;

    let broadcaster_handle = {
        let session = session.clone();
        let levels_dir = levels_dir.to_path_buf();
        thread::spawn(move || broadcaster::run(session, &levels_dir))
    };

    info!(client_id = session.client_id, "session started");
    pacman_worker::run(session.clone(), request_pipe);

    let _ = broadcaster_handle.join();
    Ok(())
}

/// §4.7 step 8's `cleanup_session`.
fn cleanup_session(session: &Arc<Session>) {
    session.flags.lock().thread_shutdown = true;
    let handles = std::mem::take(&mut *session.ghost_handles.lock());
    for handle in handles {
        let _ = handle.join();
    }
    *session.notification_pipe.lock() = None;
    info!(client_id = session.client_id, "session cleaned up");
}
