//! Per-session shared state (C4 infrastructure) and the session table (C8's
//! slot pool).

use std::fs::File;
use std::path::PathBuf;
use std::thread::JoinHandle;

use parking_lot::{Mutex, RwLock};
use pacman_common::Board;

/// Coordination flags shared between a session's pacman worker (C6),
/// broadcaster (C7), and ghost workers (C5), all guarded by one mutex
/// (§3 Session, §5 "Per-session mutex").
#[derive(Debug, Default)]
pub struct SessionFlags {
    pub thread_shutdown: bool,
    pub victory: bool,
    pub current_level: usize,
    pub total_levels: usize,
    pub accumulated_points: i32,
    pub level_change_pending: bool,
    pub new_level_index: usize,
}

/// One occupied slot in the session table.
pub struct Session {
    pub slot: usize,
    pub client_id: i32,
    pub board: RwLock<Board>,
    pub flags: Mutex<SessionFlags>,
    pub request_pipe_path: PathBuf,
    pub notification_pipe_path: PathBuf,
    pub notification_pipe: Mutex<Option<File>>,
    pub ghost_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
    pub fn new(
        slot: usize,
        client_id: i32,
        request_pipe_path: PathBuf,
        notification_pipe_path: PathBuf,
    ) -> Self {
        Self {
            slot,
            client_id,
            board: RwLock::new(Board::empty()),
            flags: Mutex::new(SessionFlags::default()),
            request_pipe_path,
            notification_pipe_path,
            notification_pipe: Mutex::new(None),
            ghost_handles: Mutex::new(Vec::new()),
        }
    }
}

/// Fixed-size slot table, one slot per worker, sized by `max_games` (§3
/// Session Table).
pub struct SessionTable {
    slots: Vec<Mutex<Option<std::sync::Arc<Session>>>>,
}

impl SessionTable {
    pub fn new(max_games: usize) -> Self {
        let slots = (0..max_games).map(|_| Mutex::new(None)).collect();
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Claim the first free slot, install `session`, and return it. `None`
    /// if every slot is occupied (§4.7 step 2: defensive, unreachable when
    /// `workers == slots`).
    pub fn claim(&self, build: impl FnOnce(usize) -> Session) -> Option<std::sync::Arc<Session>> {
        for (index, slot) in self.slots.iter().enumerate() {
            let mut guard = slot.lock();
            if guard.is_none() {
                let session = std::sync::Arc::new(build(index));
                *guard = Some(session.clone());
                return Some(session);
            }
        }
        None
    }

    /// Release a slot, clearing its `active` bit (§3 `active` flag).
    pub fn release(&self, slot: usize) {
        *self.slots[slot].lock() = None;
    }

    /// Snapshot of `(client_id, points)` for every active session, for the
    /// admin top-5 dump (§6). Iteration order is slot order.
    pub fn active_scores(&self) -> Vec<(i32, i32)> {
        let mut out = Vec::new();
        for slot in &self.slots {
            if let Some(session) = slot.lock().as_ref() {
                let flags = session.flags.lock();
                let board = session.board.read();
                out.push((session.client_id, flags.accumulated_points + board.pacman.points));
            }
        }
        out
    }
}

/// Global, shared server state (§9 "Global mutable state"). Held in an
/// `Arc` and handed to every thread; no process-wide statics.
pub struct ServerContext {
    pub levels_dir: PathBuf,
    pub sessions: SessionTable,
}

impl ServerContext {
    pub fn new(levels_dir: PathBuf, max_games: usize) -> Self {
        Self {
            levels_dir,
            sessions: SessionTable::new(max_games),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_then_release_frees_the_slot_for_reuse() {
        let table = SessionTable::new(2);
        let s1 = table
            .claim(|slot| Session::new(slot, 1, "/tmp/a_req".into(), "/tmp/a_notif".into()))
            .unwrap();
        assert_eq!(s1.slot, 0);
        let s2 = table
            .claim(|slot| Session::new(slot, 2, "/tmp/b_req".into(), "/tmp/b_notif".into()))
            .unwrap();
        assert_eq!(s2.slot, 1);
        assert!(table.claim(|slot| Session::new(slot, 3, "/tmp/c_req".into(), "/tmp/c_notif".into())).is_none());

        table.release(0);
        let s3 = table
            .claim(|slot| Session::new(slot, 3, "/tmp/c_req".into(), "/tmp/c_notif".into()))
            .unwrap();
        assert_eq!(s3.slot, 0);
    }

    #[test]
    fn active_scores_reflects_accumulated_and_current_level_points() {
        let table = SessionTable::new(1);
        let session = table
            .claim(|slot| Session::new(slot, 7, "/tmp/a_req".into(), "/tmp/a_notif".into()))
            .unwrap();
        session.flags.lock().accumulated_points = 30;
        session.board.write().pacman.points = 20;
        assert_eq!(table.active_scores(), vec![(7, 50)]);
    }
}
