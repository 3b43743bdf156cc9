//! Session and concurrency engine for the pacman game server.

pub mod broadcaster;
pub mod ghost_worker;
pub mod listener;
pub mod pacman_worker;
pub mod request_queue;
pub mod session;
pub mod session_worker;

pub use request_queue::{ConnectionRequest, RequestQueue, DEFAULT_CAPACITY};
pub use session::{ServerContext, Session, SessionFlags, SessionTable};
