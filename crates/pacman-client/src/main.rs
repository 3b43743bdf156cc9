//! `pacman-client <client_id> <register_pipe> [commands_file]` — the game
//! client binary.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use pacman_common::protocol::{BoardFrame, Disconnect, Play};
use tracing::{error, info};

use pacman_client::commands::{ClientAction, CommandScript};
use pacman_client::connection;
use pacman_client::render;

#[derive(Parser, Debug)]
#[command(name = "client", about = "Pacman multiplayer game client")]
struct Args {
    client_id: i32,
    register_pipe: PathBuf,
    commands_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    let request_pipe_path = PathBuf::from(format!("/tmp/{}_request", args.client_id));
    let notification_pipe_path = PathBuf::from(format!("/tmp/{}_notification", args.client_id));

    let session = match connection::connect(
        args.client_id,
        &args.register_pipe,
        &request_pipe_path,
        &notification_pipe_path,
    ) {
        Ok(session) => session,
        Err(err) => {
            error!(?err, "failed to connect");
            return ExitCode::FAILURE;
        }
    };

    let tempo_ms = Arc::new(AtomicI32::new(100));
    let session_ended = Arc::new(AtomicBool::new(false));

    let receiver_handle = {
        let tempo_ms = tempo_ms.clone();
        let session_ended = session_ended.clone();
        let mut notification_pipe = session.notification_pipe;
        thread::spawn(move || loop {
            match BoardFrame::read_from(&mut notification_pipe) {
                Ok(frame) => {
                    tempo_ms.store(frame.tempo, Ordering::Relaxed);
                    let ended = frame.game_over != 0 || frame.victory != 0;
                    print!("{}", render::render(&frame));
                    if ended {
                        session_ended.store(true, Ordering::Relaxed);
                        return;
                    }
                }
                Err(_) => {
                    session_ended.store(true, Ordering::Relaxed);
                    return;
                }
            }
        })
    };

    let mut request_pipe = session.request_pipe;

    if let Some(commands_file) = args.commands_file.as_deref() {
        match CommandScript::load(commands_file) {
            Ok(mut script) => run_scripted(&mut script, &mut request_pipe, &tempo_ms, &session_ended),
            Err(err) => error!(?err, "failed to load commands file"),
        }
    } else {
        run_interactive(&mut request_pipe, &session_ended);
    }

    let _ = receiver_handle.join();
    info!(client_id = args.client_id, "client exiting");
    ExitCode::SUCCESS
}

fn run_scripted(
    script: &mut CommandScript,
    request_pipe: &mut std::fs::File,
    tempo_ms: &AtomicI32,
    session_ended: &AtomicBool,
) {
    while !session_ended.load(Ordering::Relaxed) {
        let Some(action) = script.next() else { break };
        match action {
            ClientAction::Play(command) => {
                if Play { command }.write_to(request_pipe).is_err() {
                    return;
                }
            }
            ClientAction::Disconnect => {
                let _ = Disconnect.write_to(request_pipe);
                return;
            }
            ClientAction::Wait(n) => {
                let delay = Duration::from_millis(tempo_ms.load(Ordering::Relaxed).max(0) as u64);
                for _ in 0..n {
                    if session_ended.load(Ordering::Relaxed) {
                        return;
                    }
                    thread::sleep(delay);
                }
            }
        }
        let delay = Duration::from_millis(tempo_ms.load(Ordering::Relaxed).max(0) as u64);
        thread::sleep(delay);
    }
}

fn run_interactive(request_pipe: &mut std::fs::File, session_ended: &AtomicBool) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        if session_ended.load(Ordering::Relaxed) {
            return;
        }
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        let Some(command) = line.trim().chars().next() else {
            continue;
        };
        let command = command.to_ascii_uppercase();
        if command == 'Q' {
            let _ = Play { command: 'Q' }.write_to(request_pipe);
            continue;
        }
        if Play { command }.write_to(request_pipe).is_err() {
            return;
        }
    }
    let _ = Disconnect.write_to(request_pipe);
    let _ = request_pipe.flush();
}
