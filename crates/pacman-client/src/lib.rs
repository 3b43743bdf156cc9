//! Pacman game client: pipe handshake, commands-file playback, and a
//! plain-text board renderer.

pub mod commands;
pub mod connection;
pub mod render;

pub use commands::{ClientAction, CommandScript};
pub use connection::{connect, ConnectionError, Session};
