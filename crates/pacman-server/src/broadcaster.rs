//! One thread per session: periodically serialises the board to the
//! notification pipe and orchestrates level transitions (C7).

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pacman_common::protocol::BoardFrame;
use pacman_common::level;

use crate::ghost_worker;
use crate::session::Session;

/// Broadcaster cadence, independent of `tempo` (§9).
const BROADCAST_PERIOD_MS: u64 = 50;

pub fn run(session: Arc<Session>, levels_dir: &Path) {
    loop {
        let (victory, accumulated_points) = {
            let flags = session.flags.lock();
            if flags.level_change_pending {
                drop(flags);
                if !transition_level(&session, levels_dir) {
                    return;
                }
                continue;
            }
            if flags.thread_shutdown {
                return;
            }
            (flags.victory, flags.accumulated_points)
        };

        let (width, height, tempo, game_over, current_level_points, cells) = {
            let board = session.board.read();
            (
                board.width,
                board.height,
                board.tempo,
                !board.pacman.alive,
                board.pacman.points,
                board.render_cells(),
            )
        };

        let frame = BoardFrame {
            width,
            height,
            tempo,
            victory: victory as i32,
            game_over: game_over as i32,
            points: accumulated_points + current_level_points,
            cells,
        };

        let wrote = {
            let mut pipe_guard = session.notification_pipe.lock();
            match pipe_guard.as_mut() {
                Some(pipe) => frame.write_to(pipe).is_ok(),
                None => false,
            }
        };
        if !wrote {
            session.flags.lock().thread_shutdown = true;
            return;
        }

        if game_over || victory {
            thread::sleep(Duration::from_millis(tempo.max(0) as u64));
            session.flags.lock().thread_shutdown = true;
            return;
        }

        thread::sleep(Duration::from_millis(BROADCAST_PERIOD_MS));
    }
}

/// §4.6 Level Transition. Returns `false` if the session should terminate
/// (level-load failure).
fn transition_level(session: &Arc<Session>, levels_dir: &Path) -> bool {
    session.flags.lock().thread_shutdown = true;

    let old_handles = std::mem::take(&mut *session.ghost_handles.lock());
    for handle in old_handles {
        let _ = handle.join();
    }

    let new_index = session.flags.lock().new_level_index;
    let load_result = {
        let mut board = session.board.write();
        level::load_nth(&mut board, levels_dir, new_index, 0)
    };

    if load_result.is_err() {
        session.flags.lock().thread_shutdown = true;
        return false;
    }

    let ghost_count = session.board.read().ghosts.len();
    {
        let mut flags = session.flags.lock();
        flags.thread_shutdown = false;
    }

    let mut handles = Vec::with_capacity(ghost_count);
    for ghost_index in 0..ghost_count {
        let session = session.clone();
        handles.push(thread::spawn(move || ghost_worker::run(session, ghost_index)));
    }
    *session.ghost_handles.lock() = handles;

    let mut flags = session.flags.lock();
    flags.level_change_pending = false;
    true
}
