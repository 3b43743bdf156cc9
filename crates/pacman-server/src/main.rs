//! `pacman-server <levels_dir> <max_games> <register_pipe>` — the game
//! server binary.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::unistd::mkfifo;
use nix::sys::stat::Mode;
use tracing::{error, info};

use pacman_server::listener;
use pacman_server::request_queue::RequestQueue;
use pacman_server::session::ServerContext;
use pacman_server::session_worker;

#[derive(Parser, Debug)]
#[command(name = "server", about = "Pacman multiplayer game server")]
struct Args {
    /// Directory containing `.lvl` level files
    levels_dir: PathBuf,
    /// Number of concurrently supported game sessions (1-100)
    max_games: usize,
    /// Path to the well-known register pipe, created if absent
    register_pipe: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(_) => {
            eprintln!("usage: server <levels_dir> <max_games> <register_pipe>");
            return exit_code(-1);
        }
    };

    if !(1..=100).contains(&args.max_games) {
        eprintln!("usage: server <levels_dir> <max_games> <register_pipe>");
        eprintln!("max_games must be between 1 and 100");
        return exit_code(-1);
    }

    // SIGPIPE ignored globally (§5); write errors surface as short writes.
    unsafe {
        let _ = signal::signal(Signal::SIGPIPE, SigHandler::SigIgn);
    }

    if !args.register_pipe.exists() {
        if let Err(err) = mkfifo(&args.register_pipe, Mode::from_bits_truncate(0o666)) {
            error!(?err, path = ?args.register_pipe, "failed to create register pipe");
            return exit_code(1);
        }
    }

    let register_pipe = match listener::open_register_pipe(&args.register_pipe) {
        Ok(pipe) => pipe,
        Err(err) => {
            error!(?err, "failed to open register pipe");
            return exit_code(1);
        }
    };

    let queue = RequestQueue::new(pacman_server::DEFAULT_CAPACITY);
    let ctx = Arc::new(ServerContext::new(args.levels_dir.clone(), args.max_games));
    let admin_signal = Arc::new(AtomicBool::new(false));
    if let Err(err) = signal_hook::flag::register(signal_hook::consts::SIGUSR1, admin_signal.clone()) {
        error!(?err, "failed to register SIGUSR1 handler");
        return exit_code(1);
    }

    let mut worker_handles = Vec::with_capacity(args.max_games);
    for _ in 0..args.max_games {
        let consumer = queue.consumer();
        let ctx = ctx.clone();
        worker_handles.push(thread::spawn(move || {
            session_worker::run(consumer, ctx);
        }));
    }

    info!(
        max_games = args.max_games,
        levels_dir = ?args.levels_dir,
        "server listening"
    );

    let producer = queue.producer();
    listener::run(register_pipe, producer, ctx, admin_signal);

    for handle in worker_handles {
        let _ = handle.join();
    }

    ExitCode::SUCCESS
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(code.rem_euclid(256) as u8)
}
