//! One thread per session: consumes client commands and drives the level
//! state machine (C6).

use std::fs::File;
use std::io::{self, Read};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pacman_common::protocol::{OP_DISCONNECT, OP_PLAY};
use pacman_common::{move_pacman, GameOutcome};

use crate::session::Session;

const LEVEL_CHANGE_POLL_MS: u64 = 50;

enum ClientCommand {
    Play(char),
    Disconnect,
}

fn read_exact_or_eof(r: &mut impl Read, buf: &mut [u8]) -> io::Result<bool> {
    let mut read = 0;
    while read < buf.len() {
        let n = r.read(&mut buf[read..])?;
        if n == 0 {
            return Ok(read != 0);
        }
        read += n;
    }
    Ok(true)
}

/// Reads one client frame. `Ok(None)` means EOF/disconnect-equivalent.
fn read_command(pipe: &mut File) -> io::Result<Option<ClientCommand>> {
    let mut kind_buf = [0u8; 1];
    if !read_exact_or_eof(pipe, &mut kind_buf)? {
        return Ok(None);
    }
    let kind = kind_buf[0];
    match kind {
        OP_PLAY => {
            let mut cmd_buf = [0u8; 1];
            if !read_exact_or_eof(pipe, &mut cmd_buf)? {
                return Ok(None);
            }
            Ok(Some(ClientCommand::Play(cmd_buf[0] as char)))
        }
        OP_DISCONNECT => Ok(Some(ClientCommand::Disconnect)),
        _ => Ok(None),
    }
}

/// §4.5. Blocks on `request_pipe` reads; returns when the session should
/// wind down (the broadcaster observes `thread_shutdown`/`victory` next).
pub fn run(session: Arc<Session>, mut request_pipe: File) {
    loop {
        {
            let flags = session.flags.lock();
            let alive = session.board.read().pacman.alive;
            if !alive || flags.thread_shutdown || flags.victory {
                return;
            }
        }

        let command = match read_command(&mut request_pipe) {
            Ok(Some(cmd)) => cmd,
            Ok(None) | Err(_) => {
                session.flags.lock().thread_shutdown = true;
                return;
            }
        };

        match command {
            ClientCommand::Disconnect => {
                session.flags.lock().thread_shutdown = true;
                return;
            }
            ClientCommand::Play('Q') => {
                session.board.write().pacman.alive = false;
            }
            ClientCommand::Play(cmd) => {
                let (outcome, tempo, passo) = {
                    let mut board = session.board.write();
                    let outcome = move_pacman(&mut board, cmd);
                    (outcome, board.tempo, board.pacman.passo)
                };

                match outcome {
                    GameOutcome::DeadPacman => {
                        thread::sleep(tempo_delay(tempo, 0));
                    }
                    GameOutcome::ReachedPortal => {
                        thread::sleep(tempo_delay(tempo, 0));
                        handle_portal(&session, tempo);
                    }
                    GameOutcome::Moved => {
                        thread::sleep(tempo_delay(tempo, passo));
                    }
                }
            }
        }
    }
}

fn tempo_delay(tempo: i32, passo: i32) -> Duration {
    Duration::from_millis((tempo.max(0) as u64) * (1 + passo.max(0) as u64))
}

fn handle_portal(session: &Arc<Session>, tempo: i32) {
    let (current_level, total_levels) = {
        let mut flags = session.flags.lock();
        flags.current_level += 1;
        (flags.current_level, flags.total_levels)
    };

    if current_level >= total_levels {
        session.flags.lock().victory = true;
        thread::sleep(tempo_delay(tempo, 0));
        return;
    }

    {
        let mut flags = session.flags.lock();
        flags.accumulated_points += session.board.read().pacman.points;
        flags.level_change_pending = true;
        flags.new_level_index = current_level;
    }
    thread::sleep(tempo_delay(tempo, 0));

    loop {
        if !session.flags.lock().level_change_pending {
            break;
        }
        thread::sleep(Duration::from_millis(LEVEL_CHANGE_POLL_MS));
    }
    thread::sleep(tempo_delay(tempo, 0));
}
