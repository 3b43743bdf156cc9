//! Shared types for the pacman game server: the board/game model, the level
//! file grammar, and the named-pipe wire codec. Consumed by both
//! `pacman-server` and `pacman-client`.

pub mod board;
pub mod game;
pub mod level;
pub mod protocol;

pub use board::{Board, Cell, Ghost, GhostMove, Pacman};
pub use game::{move_ghost, move_pacman, GameOutcome};
pub use level::{LevelError, MAX_GHOSTS, MAX_MOVES};
pub use protocol::{
    BoardFrame, Connect, ConnectAck, Disconnect, Play, ProtocolError, OP_BOARD, OP_CONNECT,
    OP_DISCONNECT, OP_PLAY, PATH_LEN,
};
