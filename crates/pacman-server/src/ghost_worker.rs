//! One thread per ghost (C5).
//!
//! §9 resolves the reference implementation's "read lock, then mutate"
//! design in favor of the board's write lock for the whole move — see
//! DESIGN.md for the rationale.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pacman_common::move_ghost;

use crate::session::Session;

pub fn run(session: Arc<Session>, ghost_index: usize) {
    loop {
        if session.flags.lock().thread_shutdown {
            return;
        }

        let tempo_ms = {
            let mut board = session.board.write();
            move_ghost(&mut board, ghost_index);
            board.tempo
        };

        let passo = session.board.read().ghosts[ghost_index].passo;
        let delay = (tempo_ms.max(0) as u64) * (1 + passo.max(0) as u64);
        thread::sleep(Duration::from_millis(delay));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacman_common::{Board, Cell, Ghost, GhostMove};
    use std::path::PathBuf;

    fn session_with_ghost() -> Arc<Session> {
        let session = Session::new(0, 1, PathBuf::from("/tmp/a_req"), PathBuf::from("/tmp/a_notif"));
        let mut board = Board::empty();
        board.width = 3;
        board.height = 1;
        board.tempo = 1;
        board.cells = vec![Cell::default(); 3];
        board.ghosts.push(Ghost {
            pos_x: 0,
            pos_y: 0,
            moves: vec![GhostMove {
                command: 'D',
                turns: 1,
            }],
            current_move: 0,
            passo: 0,
            charged: false,
            turns_left: 0,
            rng_state: 1,
        });
        *session.board.write() = board;
        Arc::new(session)
    }

    #[test]
    fn shutdown_flag_stops_the_loop_without_moving() {
        let session = session_with_ghost();
        session.flags.lock().thread_shutdown = true;
        run(session.clone(), 0);
        assert_eq!(session.board.read().ghosts[0].pos_x, 0);
    }
}
