//! Pipe creation and the three-way CONNECT handshake (§4.7/§6).

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use pacman_common::protocol::{Connect, ConnectAck};

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("could not create fifo {0}: {1}")]
    CreateFifo(PathBuf, nix::errno::Errno),
    #[error("could not open register pipe {0}: {1}")]
    OpenRegisterPipe(PathBuf, std::io::Error),
    #[error("could not open notification pipe {0}: {1}")]
    OpenNotificationPipe(PathBuf, std::io::Error),
    #[error("could not open request pipe {0}: {1}")]
    OpenRequestPipe(PathBuf, std::io::Error),
    #[error(transparent)]
    Protocol(#[from] pacman_common::ProtocolError),
    #[error("server rejected the connection")]
    Rejected,
}

/// A connected session's two private pipes.
pub struct Session {
    pub request_pipe: File,
    pub notification_pipe: File,
}

fn create_fifo(path: &Path) -> Result<(), ConnectionError> {
    if path.exists() {
        let _ = std::fs::remove_file(path);
    }
    mkfifo(path, Mode::from_bits_truncate(0o666))
        .map_err(|e| ConnectionError::CreateFifo(path.to_path_buf(), e))
}

/// Creates the client's private pipes, sends CONNECT on the register pipe,
/// and waits for CONNECT-ACK (§6).
pub fn connect(
    client_id: i32,
    register_pipe_path: &Path,
    request_pipe_path: &Path,
    notification_pipe_path: &Path,
) -> Result<Session, ConnectionError> {
    create_fifo(request_pipe_path)?;
    create_fifo(notification_pipe_path)?;

    let mut register_pipe = OpenOptions::new()
        .write(true)
        .open(register_pipe_path)
        .map_err(|e| ConnectionError::OpenRegisterPipe(register_pipe_path.to_path_buf(), e))?;

    Connect {
        client_id,
        request_pipe: request_pipe_path.display().to_string(),
        board_pipe: notification_pipe_path.display().to_string(),
    }
    .write_to(&mut register_pipe)?;

    let mut notification_pipe = OpenOptions::new()
        .read(true)
        .open(notification_pipe_path)
        .map_err(|e| ConnectionError::OpenNotificationPipe(notification_pipe_path.to_path_buf(), e))?;

    let ack = ConnectAck::read_from(&mut notification_pipe)?;
    if !ack.accepted {
        return Err(ConnectionError::Rejected);
    }

    let request_pipe = OpenOptions::new()
        .write(true)
        .open(request_pipe_path)
        .map_err(|e| ConnectionError::OpenRequestPipe(request_pipe_path.to_path_buf(), e))?;

    Ok(Session {
        request_pipe,
        notification_pipe,
    })
}
